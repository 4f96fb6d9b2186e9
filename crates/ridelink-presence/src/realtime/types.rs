//! Configuration, protocol types, and event/command enums for the realtime client.

use ridelink_common::PresenceError;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to the realtime backend.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, e.g. `wss://presence.example.com/socket/websocket`.
    pub url: String,
    /// Heartbeat interval in seconds (default: 25).
    pub heartbeat_interval_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
    /// Connect attempt timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("url", &self.redacted_url())
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .field("max_reconnect_delay_secs", &self.max_reconnect_delay_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            connect_timeout_secs: 15,
        }
    }
}

impl RealtimeConfig {
    /// The URL without its query string, which may carry credentials.
    pub(crate) fn redacted_url(&self) -> &str {
        self.url.split('?').next().unwrap_or("")
    }

    /// Delay before the next reconnect attempt after `current`.
    pub(crate) fn next_backoff(&self, current: u64) -> u64 {
        current.saturating_mul(2).min(self.max_reconnect_delay_secs)
    }
}

// ---------------------------------------------------------------------------
// Phoenix Protocol Types
// ---------------------------------------------------------------------------

/// A Phoenix protocol message envelope (v1 JSON format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(rename = "ref")]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    pub(crate) fn new(topic: &str, event: &str, payload: serde_json::Value, msg_ref: String) -> Self {
        Self {
            topic: format!("realtime:{topic}"),
            event: event.to_string(),
            payload,
            msg_ref: Some(msg_ref),
        }
    }
}

/// Protocol event names.
pub mod events {
    pub const JOIN: &str = "phx_join";
    pub const LEAVE: &str = "phx_leave";
    pub const REPLY: &str = "phx_reply";
    pub const ERROR: &str = "phx_error";
    pub const CLOSE: &str = "phx_close";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const VALUE: &str = "value";
    pub const SET: &str = "set";
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events emitted by the realtime client.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    /// WebSocket connection established.
    Connected,
    /// WebSocket connection lost.
    Disconnected,
    /// Successfully joined a topic.
    Joined { topic: String },
    /// Topic closed or errored.
    TopicError { topic: String, message: String },
    /// The value held at a topic's path.
    Value {
        topic: String,
        value: serde_json::Value,
    },
    /// Connection-level error.
    Error(String),
}

pub(crate) type WriteReply = oneshot::Sender<Result<(), PresenceError>>;

/// Commands sent to the connection task from the application layer.
#[derive(Debug)]
pub(crate) enum RealtimeCommand {
    Join {
        topic: String,
    },
    Leave {
        topic: String,
    },
    Set {
        topic: String,
        value: serde_json::Value,
        reply: WriteReply,
    },
    Disconnect,
}
