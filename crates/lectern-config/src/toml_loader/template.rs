//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Lectern Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# application_server_url = "http://localhost:5555/"
# token_endpoint = "unified"   # unified, split
# request_timeout_secs = 10    # 1-120

[media]
# url = "ws://localhost:7880"

[bus]
# url = "ws://127.0.0.1:4000/socket/websocket"
# heartbeat_interval = 25      # 1-300
# reconnect_delay = 1          # 1-60
# max_reconnect_delay = 30     # 1-600
# connect_timeout = 15         # 1-120

[whiteboard]
# owner_pane = "left"          # left, right

[directory]
# poll_interval_secs = 5       # 1-3600

[storage]
# owner_store_path = "/path/to/owners.json"
# in_memory = false

[logging]
# level = "info"               # trace, debug, info, warn, error
"##
    .to_string()
}
