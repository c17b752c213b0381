//! Configuration, envelope types, and commands for the collaboration bus.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for the collaboration bus.
#[derive(Clone)]
pub struct BusConfig {
    /// WebSocket URL of the broker. May carry credentials in its query string.
    pub url: String,
    /// Heartbeat interval in seconds (default: 25).
    pub heartbeat_interval_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
    /// Give up on a single connect attempt after this many seconds.
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for BusConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusConfig")
            .field("url", &self.redacted_url())
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .field("max_reconnect_delay_secs", &self.max_reconnect_delay_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:4000/socket/websocket".to_string(),
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            connect_timeout_secs: 15,
        }
    }
}

impl BusConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// URL without its query string, safe to log.
    pub(crate) fn redacted_url(&self) -> &str {
        self.url.split('?').next().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Phoenix Protocol Types
// ---------------------------------------------------------------------------

/// Event names of the Phoenix channel protocol.
pub(crate) mod phx {
    pub const JOIN: &str = "phx_join";
    pub const LEAVE: &str = "phx_leave";
    pub const REPLY: &str = "phx_reply";
    pub const ERROR: &str = "phx_error";
    pub const CLOSE: &str = "phx_close";
    pub const BROADCAST: &str = "broadcast";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const HEARTBEAT_TOPIC: &str = "phoenix";
}

/// A Phoenix protocol message envelope (v1 JSON format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(rename = "ref")]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    pub(crate) fn join(topic: &str, msg_ref: String) -> Self {
        Self {
            topic: topic.to_string(),
            event: phx::JOIN.to_string(),
            payload: serde_json::json!({}),
            msg_ref: Some(msg_ref),
        }
    }

    pub(crate) fn leave(topic: &str, msg_ref: String) -> Self {
        Self {
            topic: topic.to_string(),
            event: phx::LEAVE.to_string(),
            payload: serde_json::json!({}),
            msg_ref: Some(msg_ref),
        }
    }

    pub(crate) fn broadcast(
        topic: &str,
        event: &str,
        payload: serde_json::Value,
        msg_ref: String,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            event: phx::BROADCAST.to_string(),
            payload: serde_json::json!({
                "type": "broadcast",
                "event": event,
                "payload": payload
            }),
            msg_ref: Some(msg_ref),
        }
    }

    pub(crate) fn heartbeat(msg_ref: String) -> Self {
        Self {
            topic: phx::HEARTBEAT_TOPIC.to_string(),
            event: phx::HEARTBEAT.to_string(),
            payload: serde_json::json!({}),
            msg_ref: Some(msg_ref),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages & Commands
// ---------------------------------------------------------------------------

/// A broadcast delivered to subscribers of a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Outcome of a publish. Not being connected is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    /// Handed to the connection for sending.
    Sent,
    /// Dropped because the bus is not connected.
    Suppressed,
}

/// Commands sent to the connection task.
#[derive(Debug)]
pub(crate) enum BusCommand {
    Join {
        topic: String,
    },
    Leave {
        topic: String,
    },
    Broadcast {
        topic: String,
        event: String,
        payload: serde_json::Value,
    },
}
