//! Room and session state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Participant;
use crate::token::AccessTokenSet;

/// Settings for the media side of a room session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// URL handed to the media transport on connect.
    pub media_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            media_url: "ws://localhost:7880".to_string(),
        }
    }
}

/// Lifecycle of a session's room membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Unjoined,
    Connecting,
    Joined,
    Left,
}

impl RoomState {
    /// Connecting or joined.
    pub fn is_active(self) -> bool {
        matches!(self, RoomState::Connecting | RoomState::Joined)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RoomState::Unjoined => "unjoined",
            RoomState::Connecting => "connecting",
            RoomState::Joined => "joined",
            RoomState::Left => "left",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub owner_identity: String,
    pub state: RoomState,
}

/// What a successful create/join hands back.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub room: Room,
    pub participant: Participant,
    pub tokens: AccessTokenSet,
    pub joined_at: DateTime<Utc>,
}

impl RoomHandle {
    pub fn is_owner(&self) -> bool {
        self.participant.is_owner()
    }
}
