//! HTTP client for the token-issuing service.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::identity::{Purpose, ScopedIdentity};

use super::types::{
    AccessTokenSet, ErrorResponse, TokenClientConfig, TokenIntent, TokenRequest, TokenResponse,
};

/// Source of capability tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Request one token for `identity` in `room`. No retry.
    async fn request_token(
        &self,
        intent: TokenIntent,
        room: &str,
        identity: &ScopedIdentity,
    ) -> Result<String, SessionError>;
}

/// Mint a fresh rtc + chat + whiteboard token set.
pub async fn mint_token_set(
    provider: &dyn TokenProvider,
    intent: TokenIntent,
    room: &str,
    identity: &str,
) -> Result<AccessTokenSet, SessionError> {
    let rtc = ScopedIdentity::new(Purpose::Rtc, identity);
    let chat = ScopedIdentity::new(Purpose::Chat, identity);
    let whiteboard = ScopedIdentity::new(Purpose::Whiteboard, identity);

    let (rtc, chat, whiteboard) = tokio::try_join!(
        provider.request_token(intent, room, &rtc),
        provider.request_token(intent, room, &chat),
        provider.request_token(intent, room, &whiteboard),
    )?;

    Ok(AccessTokenSet {
        rtc,
        chat,
        whiteboard,
    })
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Token service client over HTTP.
pub struct TokenClient {
    config: TokenClientConfig,
    http: reqwest::Client,
}

impl TokenClient {
    pub fn new(config: TokenClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { config, http }
    }

    pub fn config(&self) -> &TokenClientConfig {
        &self.config
    }
}

#[async_trait]
impl TokenProvider for TokenClient {
    async fn request_token(
        &self,
        intent: TokenIntent,
        room: &str,
        identity: &ScopedIdentity,
    ) -> Result<String, SessionError> {
        let url = self.config.url_for(intent);
        let body = TokenRequest {
            room_name: room,
            participant_name: identity.wire_name(),
        };

        debug!(room, purpose = %identity.purpose, ?intent, "Token request");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::TokenRequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorResponse>().await {
                Ok(ErrorResponse {
                    error_message: Some(message),
                }) => message,
                _ => format!("HTTP {status}"),
            };
            warn!(room, purpose = %identity.purpose, %status, reason = %reason, "Token request rejected");
            return Err(SessionError::TokenRequestFailed(reason));
        }

        let payload: TokenResponse = response.json().await.map_err(|e| {
            SessionError::TokenRequestFailed(format!("malformed token response: {e}"))
        })?;

        if payload.token.is_empty() {
            return Err(SessionError::TokenRequestFailed(
                "malformed token response: empty token".into(),
            ));
        }

        Ok(payload.token)
    }
}
