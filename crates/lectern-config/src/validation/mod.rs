//! Full configuration validation.
//!
//! Checks numeric ranges and URL schemes, collecting every problem into a
//! single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::LecternConfig;
use helpers::{validate_range, validate_url};
use lectern_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LecternConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_media(&mut errors, config);
    validate_bus(&mut errors, config);
    validate_range(
        &mut errors,
        "directory.poll_interval_secs",
        config.directory.poll_interval_secs,
        1,
        3600,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &LecternConfig) {
    validate_url(
        errors,
        "server.application_server_url",
        &config.server.application_server_url,
        &["http://", "https://"],
    );
    validate_range(
        errors,
        "server.request_timeout_secs",
        config.server.request_timeout_secs,
        1,
        120,
    );
}

fn validate_media(errors: &mut Vec<String>, config: &LecternConfig) {
    if config.media.url.trim().is_empty() {
        errors.push("media.url must not be empty".into());
    }
}

fn validate_bus(errors: &mut Vec<String>, config: &LecternConfig) {
    let bus = &config.bus;
    validate_url(errors, "bus.url", &bus.url, &["ws://", "wss://"]);
    validate_range(errors, "bus.heartbeat_interval", bus.heartbeat_interval, 1, 300);
    validate_range(errors, "bus.reconnect_delay", bus.reconnect_delay, 1, 60);
    validate_range(errors, "bus.max_reconnect_delay", bus.max_reconnect_delay, 1, 600);
    validate_range(errors, "bus.connect_timeout", bus.connect_timeout, 1, 120);
    if bus.reconnect_delay > bus.max_reconnect_delay {
        errors.push(format!(
            "bus.reconnect_delay ({}) exceeds bus.max_reconnect_delay ({})",
            bus.reconnect_delay, bus.max_reconnect_delay
        ));
    }
}
