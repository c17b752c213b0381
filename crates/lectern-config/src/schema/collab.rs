//! Media, collaboration bus, and whiteboard settings.

use lectern_room::BoardId;
use serde::{Deserialize, Serialize};

/// Real-time media service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// URL handed to the media transport on connect.
    pub url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:7880".into(),
        }
    }
}

/// Collaboration bus connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    /// Broker WebSocket URL (`ws://` or `wss://`).
    pub url: String,
    /// Heartbeat interval in seconds (valid range: 1-300).
    pub heartbeat_interval: u32,
    /// Initial reconnect delay in seconds (valid range: 1-60).
    pub reconnect_delay: u32,
    /// Reconnect delay ceiling in seconds (valid range: 1-600).
    pub max_reconnect_delay: u32,
    /// Connect timeout in seconds (valid range: 1-120).
    pub connect_timeout: u32,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:4000/socket/websocket".into(),
            heartbeat_interval: 25,
            reconnect_delay: 1,
            max_reconnect_delay: 30,
            connect_timeout: 15,
        }
    }
}

/// Whiteboard pane assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteboardConfig {
    /// Pane the room owner draws on; attendees get the other one.
    pub owner_pane: BoardId,
}

impl Default for WhiteboardConfig {
    fn default() -> Self {
        Self {
            owner_pane: BoardId::Left,
        }
    }
}
