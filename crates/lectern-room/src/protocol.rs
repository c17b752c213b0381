//! Application-level payloads carried over the collaboration bus.
//!
//! The transport envelope (Phoenix channel frames) is handled by `bus`.
//! Drawing elements are opaque to this crate and pass through verbatim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single element produced by the external drawing surface.
pub type DrawingElement = serde_json::Value;

/// Event names used in bus broadcasts.
pub mod events {
    pub const BOARD_UPDATE: &str = "board-update";
}

/// Bus topic carrying whiteboard updates for a room.
pub fn board_topic(room: &str) -> String {
    format!("room:{room}:whiteboard")
}

// ---------------------------------------------------------------------------
// Boards
// ---------------------------------------------------------------------------

/// One of the two whiteboard panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardId {
    Left,
    Right,
}

impl BoardId {
    pub const ALL: [BoardId; 2] = [BoardId::Left, BoardId::Right];

    pub fn other(self) -> BoardId {
        match self {
            BoardId::Left => BoardId::Right,
            BoardId::Right => BoardId::Left,
        }
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardId::Left => f.write_str("left"),
            BoardId::Right => f.write_str("right"),
        }
    }
}

impl FromStr for BoardId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(BoardId::Left),
            "right" => Ok(BoardId::Right),
            other => Err(format!("unknown board: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaboration events
// ---------------------------------------------------------------------------

/// Unit broadcast over the collaboration bus.
///
/// Carries a full snapshot of one pane. There is no sequence number: the
/// last snapshot received for a pane replaces whatever was there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CollaborationEvent {
    #[serde(rename = "board-update")]
    BoardUpdate {
        #[serde(rename = "boardId")]
        board_id: BoardId,
        elements: Vec<DrawingElement>,
        sender: String,
    },
}

impl CollaborationEvent {
    pub fn board_update(
        board_id: BoardId,
        elements: Vec<DrawingElement>,
        sender: impl Into<String>,
    ) -> Self {
        CollaborationEvent::BoardUpdate {
            board_id,
            elements,
            sender: sender.into(),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            CollaborationEvent::BoardUpdate { .. } => events::BOARD_UPDATE,
        }
    }
}
