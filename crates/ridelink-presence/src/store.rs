//! The remote presence store seam and its wire types.

use async_trait::async_trait;
use ridelink_common::PresenceError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// The record published for every local toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub connected: bool,
    pub version: u64,
    /// RFC 3339 wall-clock time of the write; informational only.
    pub updated_at: String,
}

impl PresenceRecord {
    pub fn new(connected: bool, version: u64) -> Self {
        Self {
            connected,
            version,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A value observed on the presence path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteValue {
    pub connected: bool,
    /// `None` for writers that store a bare boolean.
    pub version: Option<u64>,
}

impl RemoteValue {
    /// Parse the JSON held at the presence path.
    ///
    /// Accepts a bare boolean or a record object. `null` (no value written
    /// yet) and anything else yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(connected) => Some(Self {
                connected: *connected,
                version: None,
            }),
            serde_json::Value::Object(map) => Some(Self {
                connected: map.get("connected")?.as_bool()?,
                version: map.get("version").and_then(|v| v.as_u64()),
            }),
            _ => None,
        }
    }
}

impl From<&PresenceRecord> for RemoteValue {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            connected: record.connected,
            version: Some(record.version),
        }
    }
}

/// Delivered on a presence subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    Value(RemoteValue),
    Error(PresenceError),
}

/// A live subscription to the presence path.
///
/// Cancelling is idempotent and also happens on drop. Nothing is
/// delivered after [`PresenceSubscription::cancel`] returns.
pub struct PresenceSubscription {
    rx: mpsc::UnboundedReceiver<RemoteEvent>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl PresenceSubscription {
    pub fn new(
        rx: mpsc::UnboundedReceiver<RemoteEvent>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Next event, or `None` once cancelled or the store is gone.
    pub async fn recv(&mut self) -> Option<RemoteEvent> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            self.rx.close();
            on_cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.on_cancel.is_none()
    }
}

impl Drop for PresenceSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for PresenceSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSubscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Remote key-value reference holding the `connected` field.
///
/// Delivery is at-least-once with no ordering guarantee between a local
/// write and the echo of an earlier one.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Subscribe to the presence path. The current value is delivered
    /// first, then every change.
    fn subscribe(&self) -> PresenceSubscription;

    /// Write a record. Resolves once the backend acknowledges or fails.
    async fn set(&self, record: PresenceRecord) -> Result<(), PresenceError>;

    /// Write `message` to `path` to check that the backend accepts writes.
    async fn probe(&self, path: &str, message: &str) -> Result<(), PresenceError>;
}
