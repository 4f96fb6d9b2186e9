//! Map and location validation.

use crate::schema::RideLinkConfig;

use super::helpers::{validate_non_empty, validate_range, validate_range_f64};

pub(crate) fn validate_map(errors: &mut Vec<String>, config: &RideLinkConfig) {
    validate_range_f64(errors, "map.zoom", config.map.zoom, 0.0, 22.0);
    validate_non_empty(errors, "map.marker_icon", &config.map.marker_icon);
}

pub(crate) fn validate_location(errors: &mut Vec<String>, config: &RideLinkConfig) {
    validate_range(
        errors,
        "location.channel_capacity",
        config.location.channel_capacity,
        1,
        4096,
    );
    validate_range(
        errors,
        "location.replay_interval_ms",
        config.location.replay_interval_ms,
        10,
        60_000,
    );
}
