//! RideLink configuration system.
//!
//! TOML-based configuration with validation. All sections use sensible
//! defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ridelink_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{RideLinkConfig, CONFIG_SCHEMA_VERSION};

use ridelink_common::ConfigError;
use std::path::Path;

/// Load config from `path`, or from the platform default path when `None`.
///
/// The default path is created with a documented template when missing.
/// The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<RideLinkConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &RideLinkConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&RideLinkConfig::default());
        assert!(json.contains("\"presence\""));
        assert!(json.contains("\"location\""));
        assert!(json.contains("\"map\""));
        assert!(json.contains("\"logging\""));
        assert!(json.contains("\"driver_status/connected\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn load_config_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[presence]\nwrite_timeout = 0\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"DEBUG\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.logging.level, schema::LogLevel::Debug);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = config_to_json(&RideLinkConfig::default());
        let parsed: RideLinkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.presence.path, "driver_status/connected");
        assert!((parsed.map.zoom - 15.0).abs() < f64::EPSILON);
    }
}
