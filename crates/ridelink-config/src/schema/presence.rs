//! Remote presence channel configuration.

use serde::{Deserialize, Serialize};

/// Presence channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub enabled: bool,
    /// WebSocket URL of the realtime backend. Empty means offline.
    pub server_url: String,
    /// Path of the boolean field shared with the backend.
    pub path: String,
    /// Path written once per session to check connectivity. Empty disables the probe.
    pub probe_path: String,
    /// Heartbeat interval in seconds (valid range: 5-300).
    pub heartbeat_interval: u32,
    /// Reconnect base delay in seconds (valid range: 1-60).
    pub reconnect_delay: u32,
    /// Maximum reconnect delay in seconds (valid range: 1-600).
    pub max_reconnect_delay: u32,
    /// Seconds to wait for a write acknowledgment (valid range: 1-120).
    pub write_timeout: u32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server_url: String::new(),
            path: "driver_status/connected".into(),
            probe_path: "test_message".into(),
            heartbeat_interval: 25,
            reconnect_delay: 1,
            max_reconnect_delay: 30,
            write_timeout: 10,
        }
    }
}
