use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{GeoPoint, PresenceOrigin, SurfaceLifecycleState};

/// UI-facing events emitted by the driver session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DriverEvent {
    PresenceChanged {
        connected: bool,
        origin: PresenceOrigin,
        version: u64,
    },
    MarkerMoved(GeoPoint),
    LifecycleChanged(SurfaceLifecycleState),
    PermissionNotice { visible: bool },
    Warning(String),
    Shutdown,
    #[serde(other)]
    Unknown,
}

pub struct EventBus {
    sender: broadcast::Sender<DriverEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.sender.subscribe()
    }

    /// Publish to every subscriber. Returns how many received it.
    pub fn publish(&self, event: DriverEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
