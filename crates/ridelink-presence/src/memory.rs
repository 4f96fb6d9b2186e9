//! In-process presence store, used offline and in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ridelink_common::PresenceError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::store::{PresenceRecord, PresenceStore, PresenceSubscription, RemoteEvent, RemoteValue};

#[derive(Default)]
struct MemoryState {
    value: Option<RemoteValue>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<RemoteEvent>>,
    next_subscriber: u64,
    fail_writes: Option<PresenceError>,
    hold_echoes: bool,
    held: Vec<RemoteValue>,
    writes: Vec<PresenceRecord>,
    probes: Vec<(String, String)>,
}

impl MemoryState {
    fn fan_out(&mut self, event: RemoteEvent) {
        self.subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

/// Presence store backed by process memory.
///
/// Writes are echoed to every subscriber. Echoes can be held back and
/// released later in any order to reproduce out-of-order delivery.
#[derive(Clone, Default)]
pub struct MemoryPresenceStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a value, as if written by a previous session.
    pub fn with_value(value: RemoteValue) -> Self {
        let store = Self::new();
        store.lock().value = Some(value);
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent write fail with `error` (or succeed again with `None`).
    pub fn fail_writes(&self, error: Option<PresenceError>) {
        self.lock().fail_writes = error;
    }

    /// Queue echoes instead of delivering them.
    pub fn hold_echoes(&self, hold: bool) {
        self.lock().hold_echoes = hold;
    }

    /// Deliver the held echo at `index` (in write order). Returns `false` if none.
    pub fn release_echo(&self, index: usize) -> bool {
        let mut state = self.lock();
        if index >= state.held.len() {
            return false;
        }
        let value = state.held.remove(index);
        state.fan_out(RemoteEvent::Value(value));
        true
    }

    /// Simulate a write by another client.
    pub fn push_remote(&self, value: RemoteValue) {
        let mut state = self.lock();
        state.value = Some(value);
        state.fan_out(RemoteEvent::Value(value));
    }

    /// Simulate a subscription error.
    pub fn push_error(&self, error: PresenceError) {
        self.lock().fan_out(RemoteEvent::Error(error));
    }

    pub fn value(&self) -> Option<RemoteValue> {
        self.lock().value
    }

    pub fn writes(&self) -> Vec<PresenceRecord> {
        self.lock().writes.clone()
    }

    pub fn probes(&self) -> Vec<(String, String)> {
        self.lock().probes.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    fn subscribe(&self) -> PresenceSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        if let Some(value) = state.value {
            let _ = tx.send(RemoteEvent::Value(value));
        }
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.insert(id, tx);
        drop(state);

        let shared = Arc::clone(&self.state);
        PresenceSubscription::new(rx, move || {
            let mut state = shared.lock().unwrap_or_else(|p| p.into_inner());
            state.subscribers.remove(&id);
            debug!(subscriber = id, "memory presence subscription cancelled");
        })
    }

    async fn set(&self, record: PresenceRecord) -> Result<(), PresenceError> {
        let mut state = self.lock();
        if let Some(error) = state.fail_writes.clone() {
            return Err(error);
        }
        let value = RemoteValue::from(&record);
        state.value = Some(value);
        state.writes.push(record);
        if state.hold_echoes {
            state.held.push(value);
        } else {
            state.fan_out(RemoteEvent::Value(value));
        }
        Ok(())
    }

    async fn probe(&self, path: &str, message: &str) -> Result<(), PresenceError> {
        let mut state = self.lock();
        if let Some(error) = state.fail_writes.clone() {
            return Err(error);
        }
        state.probes.push((path.to_string(), message.to_string()));
        Ok(())
    }
}
