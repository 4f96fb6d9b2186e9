//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    assert!(validate(&RideLinkConfig::default()).is_ok());
}

#[test]
fn catches_zoom_out_of_range() {
    let mut config = RideLinkConfig::default();
    config.map.zoom = 23.5;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("map.zoom"));
}

#[test]
fn catches_nan_zoom() {
    let mut config = RideLinkConfig::default();
    config.map.zoom = f64::NAN;
    assert!(validate(&config).is_err());
}

#[test]
fn catches_empty_presence_path() {
    let mut config = RideLinkConfig::default();
    config.presence.path = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.path must not be empty"));
}

#[test]
fn catches_backoff_ceiling_below_base() {
    let mut config = RideLinkConfig::default();
    config.presence.reconnect_delay = 20;
    config.presence.max_reconnect_delay = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.max_reconnect_delay = 10 is below"));
}

#[test]
fn catches_non_websocket_url() {
    let mut config = RideLinkConfig::default();
    config.presence.server_url = "https://example.com".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.server_url"));
}

#[test]
fn accepts_wss_url() {
    let mut config = RideLinkConfig::default();
    config.presence.server_url = "wss://example.com/socket".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_multiple_errors() {
    let mut config = RideLinkConfig::default();
    config.presence.heartbeat_interval = 1;
    config.location.channel_capacity = 0;
    config.map.marker_icon = String::new();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.heartbeat_interval"));
    assert!(err.contains("location.channel_capacity"));
    assert!(err.contains("map.marker_icon"));
    assert_eq!(err.matches("; ").count(), 2);
}
