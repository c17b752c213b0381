//! Configuration, wire payloads, and the minted token set.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which endpoints the token service exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenEndpoint {
    /// `POST /token` for both creating and joining.
    #[default]
    Unified,
    /// `POST /token` for creators, `POST /join` for attendees.
    Split,
}

/// Why a token set is being minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenIntent {
    Create,
    Join,
}

/// Configuration for the token service client.
#[derive(Debug, Clone)]
pub struct TokenClientConfig {
    /// Base URL of the application server (e.g. `https://example.com:5555/`).
    pub base_url: String,
    pub endpoint: TokenEndpoint,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TokenClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5555/".to_string(),
            endpoint: TokenEndpoint::Unified,
            timeout_secs: 10,
        }
    }
}

impl TokenClientConfig {
    pub(crate) fn url_for(&self, intent: TokenIntent) -> String {
        let base = self.base_url.trim_end_matches('/');
        match (self.endpoint, intent) {
            (TokenEndpoint::Split, TokenIntent::Join) => format!("{base}/join"),
            _ => format!("{base}/token"),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequest<'a> {
    pub room_name: &'a str,
    pub participant_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorResponse {
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Token set
// ---------------------------------------------------------------------------

/// The three capability tokens minted for one create/join.
///
/// Tokens are opaque. They are never cached across sessions.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessTokenSet {
    pub rtc: String,
    pub chat: String,
    pub whiteboard: String,
}

impl std::fmt::Debug for AccessTokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenSet")
            .field("rtc", &"[REDACTED]")
            .field("chat", &"[REDACTED]")
            .field("whiteboard", &"[REDACTED]")
            .finish()
    }
}
