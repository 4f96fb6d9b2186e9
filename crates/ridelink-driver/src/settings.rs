//! Per-session settings derived from the loaded configuration.

use ridelink_config::RideLinkConfig;
use ridelink_map::{MarkerSettings, PuckSettings};

/// Value written to the probe path on first activation.
pub const PROBE_MESSAGE: &str = "Hello from ridelink";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Presence value before anything is read or toggled.
    pub initial_connected: bool,
    /// Empty disables the connectivity probe.
    pub probe_path: String,
    pub probe_message: String,
    pub marker: MarkerSettings,
    pub location_capacity: usize,
    pub event_capacity: usize,
    pub notification_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            initial_connected: false,
            probe_path: "test_message".into(),
            probe_message: PROBE_MESSAGE.into(),
            marker: MarkerSettings::default(),
            location_capacity: 64,
            event_capacity: 256,
            notification_capacity: 16,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &RideLinkConfig) -> Self {
        Self {
            probe_path: config.presence.probe_path.clone(),
            marker: MarkerSettings {
                zoom: config.map.zoom,
                icon: config.map.marker_icon.clone(),
                puck: PuckSettings {
                    enabled: config.map.puck_enabled,
                    pulsing: config.map.puck_pulsing,
                },
            },
            location_capacity: config.location.channel_capacity as usize,
            ..Self::default()
        }
    }
}
