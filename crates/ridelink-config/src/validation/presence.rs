//! Presence channel validation.

use crate::schema::RideLinkConfig;

use super::helpers::{validate_non_empty, validate_range};

pub(crate) fn validate_presence(errors: &mut Vec<String>, config: &RideLinkConfig) {
    let presence = &config.presence;

    validate_non_empty(errors, "presence.path", &presence.path);
    validate_range(
        errors,
        "presence.heartbeat_interval",
        presence.heartbeat_interval,
        5,
        300,
    );
    validate_range(
        errors,
        "presence.reconnect_delay",
        presence.reconnect_delay,
        1,
        60,
    );
    validate_range(
        errors,
        "presence.max_reconnect_delay",
        presence.max_reconnect_delay,
        1,
        600,
    );
    validate_range(errors, "presence.write_timeout", presence.write_timeout, 1, 120);

    if presence.max_reconnect_delay < presence.reconnect_delay {
        errors.push(format!(
            "presence.max_reconnect_delay = {} is below presence.reconnect_delay = {}",
            presence.max_reconnect_delay, presence.reconnect_delay
        ));
    }

    let url = presence.server_url.trim();
    if !url.is_empty() && !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!(
            "presence.server_url = {url} must use ws:// or wss://"
        ));
    }
}
