//! Configuration schema types for RideLink.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod location;
mod logging;
mod map;
mod presence;

pub use location::*;
pub use logging::*;
pub use map::*;
pub use presence::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RideLinkConfig {
    pub presence: PresenceConfig,
    pub location: LocationConfig,
    pub map: MapConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_presence_section() {
        let config = RideLinkConfig::default();
        assert!(config.presence.enabled);
        assert!(config.presence.server_url.is_empty());
        assert_eq!(config.presence.path, "driver_status/connected");
        assert_eq!(config.presence.probe_path, "test_message");
        assert_eq!(config.presence.heartbeat_interval, 25);
        assert_eq!(config.presence.reconnect_delay, 1);
        assert_eq!(config.presence.max_reconnect_delay, 30);
        assert_eq!(config.presence.write_timeout, 10);
    }

    #[test]
    fn default_map_section() {
        let config = RideLinkConfig::default();
        assert!((config.map.zoom - 15.0).abs() < f64::EPSILON);
        assert_eq!(config.map.marker_icon, "user-location-marker");
        assert!(config.map.puck_enabled);
        assert!(config.map.puck_pulsing);
    }

    #[test]
    fn default_location_and_logging() {
        let config = RideLinkConfig::default();
        assert_eq!(config.location.channel_capacity, 64);
        assert_eq!(config.location.replay_interval_ms, 1000);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: RideLinkConfig = toml::from_str(
            r#"
[map]
zoom = 17.5
"#,
        )
        .unwrap();
        assert!((config.map.zoom - 17.5).abs() < f64::EPSILON);
        assert_eq!(config.map.marker_icon, "user-location-marker");
        assert_eq!(config.presence.path, "driver_status/connected");
    }

    #[test]
    fn log_level_parses_uppercase() {
        let config: RideLinkConfig = toml::from_str("[logging]\nlevel = \"WARNING\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.logging.level.as_directive(), "warn");
    }
}
