//! Broker-level wire protocol: Phoenix channel v1 envelopes.
//!
//! Broadcast frames are forwarded verbatim; only the envelope is inspected.

use serde::{Deserialize, Serialize};

pub const JOIN: &str = "phx_join";
pub const LEAVE: &str = "phx_leave";
pub const REPLY: &str = "phx_reply";
pub const BROADCAST: &str = "broadcast";
pub const HEARTBEAT: &str = "heartbeat";

/// A Phoenix protocol message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
}

impl Frame {
    /// `phx_reply` with status `ok` echoing the request's topic and ref.
    pub fn reply_ok(request: &Frame) -> Self {
        Self {
            topic: request.topic.clone(),
            event: REPLY.to_string(),
            payload: serde_json::json!({ "status": "ok", "response": {} }),
            msg_ref: request.msg_ref.clone(),
        }
    }

    /// `phx_reply` with status `error` and a reason.
    pub fn reply_error(request: &Frame, reason: &str) -> Self {
        Self {
            topic: request.topic.clone(),
            event: REPLY.to_string(),
            payload: serde_json::json!({ "status": "error", "response": { "reason": reason } }),
            msg_ref: request.msg_ref.clone(),
        }
    }
}
