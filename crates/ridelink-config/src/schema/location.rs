use serde::{Deserialize, Serialize};

/// Location delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Buffered samples between the provider task and the session (valid range: 1-4096).
    pub channel_capacity: u32,
    /// Interval between replayed track points in milliseconds (valid range: 10-60000).
    pub replay_interval_ms: u32,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            replay_interval_ms: 1000,
        }
    }
}
