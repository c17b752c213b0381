//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = LecternConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_bad_server_url() {
    let mut config = LecternConfig::default();
    config.server.application_server_url = "localhost:5555".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.application_server_url"));
}

#[test]
fn catches_bare_scheme() {
    let mut config = LecternConfig::default();
    config.bus.url = "ws://".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("bus.url"));
}

#[test]
fn catches_http_bus_url() {
    let mut config = LecternConfig::default();
    config.bus.url = "http://127.0.0.1:4000".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("bus.url"));
}

#[test]
fn catches_zero_timeout() {
    let mut config = LecternConfig::default();
    config.server.request_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.request_timeout_secs"));
}

#[test]
fn catches_inverted_backoff() {
    let mut config = LecternConfig::default();
    config.bus.reconnect_delay = 40;
    config.bus.max_reconnect_delay = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("exceeds"));
}

#[test]
fn catches_empty_media_url() {
    let mut config = LecternConfig::default();
    config.media.url = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("media.url"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = LecternConfig::default();
    config.bus.heartbeat_interval = 0;
    config.directory.poll_interval_secs = 0;
    config.server.application_server_url = "ftp://x".into();
    let err = validate(&config).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
    let msg = err.to_string();
    assert!(msg.contains("bus.heartbeat_interval"));
    assert!(msg.contains("directory.poll_interval_secs"));
    assert!(msg.contains("server.application_server_url"));
}
