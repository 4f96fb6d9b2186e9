use serde::{Deserialize, Serialize};

/// Map surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Fixed camera zoom applied on every recenter (valid range: 0.0-22.0).
    pub zoom: f64,
    /// Style image id used for the driver marker.
    pub marker_icon: String,
    /// Show the built-in location puck.
    pub puck_enabled: bool,
    /// Pulse animation on the location puck.
    pub puck_pulsing: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 15.0,
            marker_icon: "user-location-marker".into(),
            puck_enabled: true,
            puck_pulsing: true,
        }
    }
}
