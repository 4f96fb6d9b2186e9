//! Presence store backed by the realtime backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ridelink_common::PresenceError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::realtime::{RealtimeClient, RealtimeConfig, RealtimeEvent};
use crate::store::{PresenceRecord, PresenceStore, PresenceSubscription, RemoteEvent, RemoteValue};

#[derive(Default)]
struct Fanout {
    subscribers: HashMap<u64, mpsc::UnboundedSender<RemoteEvent>>,
    next_id: u64,
    last: Option<RemoteValue>,
}

#[derive(Clone, Default)]
struct SharedFanout(Arc<Mutex<Fanout>>);

impl SharedFanout {
    fn lock(&self) -> MutexGuard<'_, Fanout> {
        self.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a subscriber. Returns its id and whether it is the first.
    fn add(&self, tx: mpsc::UnboundedSender<RemoteEvent>) -> (u64, bool) {
        let mut fanout = self.lock();
        if let Some(value) = fanout.last {
            let _ = tx.send(RemoteEvent::Value(value));
        }
        let id = fanout.next_id;
        fanout.next_id += 1;
        let first = fanout.subscribers.is_empty();
        fanout.subscribers.insert(id, tx);
        (id, first)
    }

    /// Remove a subscriber. Returns `true` if none are left.
    fn remove(&self, id: u64) -> bool {
        let mut fanout = self.lock();
        fanout.subscribers.remove(&id);
        if fanout.subscribers.is_empty() {
            fanout.last = None;
            true
        } else {
            false
        }
    }

    fn publish(&self, event: RemoteEvent) {
        let mut fanout = self.lock();
        if let RemoteEvent::Value(value) = event {
            fanout.last = Some(value);
        }
        fanout.subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

/// Route realtime events for `path` to presence subscribers.
async fn route_events(mut events: mpsc::Receiver<RealtimeEvent>, fanout: SharedFanout, path: String) {
    while let Some(event) = events.recv().await {
        match event {
            RealtimeEvent::Value { topic, value } if topic == path => {
                match RemoteValue::from_json(&value) {
                    Some(remote) => fanout.publish(RemoteEvent::Value(remote)),
                    None if value.is_null() => debug!(path = %path, "presence path is empty"),
                    None => warn!(path = %path, value = %value, "unrecognized presence value"),
                }
            }
            RealtimeEvent::TopicError { topic, message } if topic == path => {
                fanout.publish(RemoteEvent::Error(PresenceError::ReadFailed(message)));
            }
            RealtimeEvent::Error(message) => {
                fanout.publish(RemoteEvent::Error(PresenceError::ReadFailed(message)));
            }
            RealtimeEvent::Connected => info!("presence backend connected"),
            RealtimeEvent::Disconnected => info!("presence backend disconnected"),
            RealtimeEvent::Joined { topic } => debug!(topic = %topic, "subscribed"),
            other => debug!(event = ?other, "ignoring realtime event"),
        }
    }
    debug!(path = %path, "presence event router stopped");
}

/// [`PresenceStore`] over a realtime WebSocket connection.
///
/// The path is joined while at least one subscription is live. Dropping
/// the store closes the connection.
pub struct RealtimePresenceStore {
    client: RealtimeClient,
    fanout: SharedFanout,
    path: String,
    write_timeout: Duration,
}

impl RealtimePresenceStore {
    /// Connect to the backend and route values for `path`.
    pub fn connect(config: RealtimeConfig, path: &str, write_timeout: Duration) -> Self {
        let (client, events) = RealtimeClient::connect(config);
        Self::with_client(client, events, path, write_timeout)
    }

    fn with_client(
        client: RealtimeClient,
        events: mpsc::Receiver<RealtimeEvent>,
        path: &str,
        write_timeout: Duration,
    ) -> Self {
        let fanout = SharedFanout::default();
        tokio::spawn(route_events(events, fanout.clone(), path.to_string()));
        Self {
            client,
            fanout,
            path: path.to_string(),
            write_timeout,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn is_connected(&self) -> bool {
        self.client.is_connected().await
    }

    /// Leave every topic and close the connection.
    pub async fn shutdown(&self) {
        self.client.disconnect().await;
    }
}

#[async_trait]
impl PresenceStore for RealtimePresenceStore {
    fn subscribe(&self) -> PresenceSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let (id, first) = self.fanout.add(tx);
        if first {
            self.client.try_join(&self.path);
        }

        let fanout = self.fanout.clone();
        let client = self.client.clone_sender();
        let path = self.path.clone();
        PresenceSubscription::new(rx, move || {
            if fanout.remove(id) {
                client.try_leave(&path);
            }
            debug!(subscriber = id, "presence subscription cancelled");
        })
    }

    async fn set(&self, record: PresenceRecord) -> Result<(), PresenceError> {
        let value = serde_json::to_value(&record)
            .map_err(|e| PresenceError::WriteFailed(e.to_string()))?;
        self.client.set(&self.path, value, self.write_timeout).await
    }

    async fn probe(&self, path: &str, message: &str) -> Result<(), PresenceError> {
        self.client
            .set(path, serde_json::Value::from(message), self.write_timeout)
            .await
    }
}
