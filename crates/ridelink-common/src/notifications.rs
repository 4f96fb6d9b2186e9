use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Severity level for in-app notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// An in-app notice shown over the map.
///
/// Blocking notices have no TTL and stay until dismissed by key.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub key: Option<&'static str>,
    pub title: String,
    pub body: String,
    pub created_at: Instant,
    pub ttl: Option<Duration>,
}

impl Notification {
    /// Creates an info notice with a 5-second TTL.
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::transient(NotificationLevel::Info, title, body, Duration::from_secs(5))
    }

    /// Creates a warning notice with an 8-second TTL.
    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::transient(NotificationLevel::Warning, title, body, Duration::from_secs(8))
    }

    /// Creates a blocking notice that only goes away through [`NotificationQueue::dismiss`].
    pub fn blocking(key: &'static str, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            key: Some(key),
            title: title.into(),
            body: body.into(),
            created_at: Instant::now(),
            ttl: None,
        }
    }

    fn transient(
        level: NotificationLevel,
        title: impl Into<String>,
        body: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            level,
            key: None,
            title: title.into(),
            body: body.into(),
            created_at: Instant::now(),
            ttl: Some(ttl),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.ttl.is_none()
    }

    /// Returns `true` if this notice has exceeded its TTL.
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.created_at.elapsed() >= ttl,
            None => false,
        }
    }
}

/// A bounded queue of notices that auto-evicts expired entries.
///
/// Blocking notices are never evicted for capacity and a second blocking
/// notice with the same key replaces the first.
#[derive(Debug)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, notification: Notification) {
        self.evict_expired();
        if let Some(key) = notification.key {
            self.items.retain(|n| n.key != Some(key));
        }
        if self.items.len() >= self.capacity {
            if let Some(idx) = self.items.iter().position(|n| !n.is_blocking()) {
                self.items.remove(idx);
            }
        }
        self.items.push_back(notification);
    }

    /// Removes the blocking notice with `key`. Returns `true` if one was shown.
    pub fn dismiss(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.key != Some(key));
        before != self.items.len()
    }

    pub fn has_blocking(&self, key: &str) -> bool {
        self.items.iter().any(|n| n.key == Some(key))
    }

    /// Returns all currently visible (non-expired) notices.
    pub fn visible(&mut self) -> Vec<&Notification> {
        self.evict_expired();
        self.items.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn evict_expired(&mut self) {
        self.items.retain(|n| !n.is_expired());
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(16)
    }
}
