//! Access token client.
//!
//! Requests purpose-scoped capability tokens (rtc, chat, whiteboard) from an
//! external token service. Tokens are opaque strings here; their scope and
//! expiry are the service's business.

mod client;
mod types;


pub use client::{mint_token_set, TokenClient, TokenProvider};
pub use types::{AccessTokenSet, TokenClientConfig, TokenEndpoint, TokenIntent};
