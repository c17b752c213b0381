//! Application server settings: token endpoint and room directory.

use lectern_room::TokenEndpoint;
use serde::{Deserialize, Serialize};

/// Token and room-list HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the application server.
    pub application_server_url: String,
    /// `unified` (`/token` only) or `split` (`/token` + `/join`).
    pub token_endpoint: TokenEndpoint,
    /// Per-request timeout in seconds (valid range: 1-120).
    pub request_timeout_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application_server_url: "http://localhost:5555/".into(),
            token_endpoint: TokenEndpoint::Unified,
            request_timeout_secs: 10,
        }
    }
}

/// Room directory polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Seconds between room list refreshes (valid range: 1-3600).
    pub poll_interval_secs: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}
