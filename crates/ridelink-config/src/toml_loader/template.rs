//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# RideLink driver configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[presence]
# enabled = true
# server_url = ""                    # wss:// realtime endpoint; empty = offline
# path = "driver_status/connected"
# probe_path = "test_message"        # empty disables the connectivity probe
# heartbeat_interval = 25            # 5-300 seconds
# reconnect_delay = 1                # 1-60 seconds
# max_reconnect_delay = 30           # 1-600 seconds
# write_timeout = 10                 # 1-120 seconds

[location]
# channel_capacity = 64              # 1-4096
# replay_interval_ms = 1000          # 10-60000

[map]
# zoom = 15.0                        # 0.0-22.0
# marker_icon = "user-location-marker"
# puck_enabled = true
# puck_pulsing = true

[logging]
# level = "INFO"                     # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
