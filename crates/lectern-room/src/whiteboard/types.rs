//! Pane binding, outcomes, and change notifications for the whiteboard.

use serde::{Deserialize, Serialize};

use crate::identity::Role;
use crate::protocol::{BoardId, DrawingElement};

/// Which pane each role may draw on. Fixed for the lifetime of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneBinding {
    /// Pane owned by the room owner; attendees own the other one.
    pub owner_pane: BoardId,
}

impl Default for PaneBinding {
    fn default() -> Self {
        Self {
            owner_pane: BoardId::Left,
        }
    }
}

impl PaneBinding {
    pub fn new(owner_pane: BoardId) -> Self {
        Self { owner_pane }
    }

    /// The pane `role` may write.
    pub fn pane_for(&self, role: Role) -> BoardId {
        match role {
            Role::Owner => self.owner_pane,
            Role::Attendee => self.owner_pane.other(),
        }
    }

    /// The role allowed to write `pane`.
    pub fn owning_role(&self, pane: BoardId) -> Role {
        if pane == self.owner_pane {
            Role::Owner
        } else {
            Role::Attendee
        }
    }

    pub fn owns(&self, role: Role, pane: BoardId) -> bool {
        self.owning_role(pane) == role
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WhiteboardError {
    #[error("pane {pane} is read-only for role {role}")]
    ReadOnlyPane { pane: BoardId, role: Role },
}

/// What happened to an inbound bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The pane was replaced with the received snapshot.
    Applied,
    /// The snapshot targets the pane we own; our local copy wins.
    IgnoredOwnPane,
    /// Not a whiteboard event.
    Unrecognized,
    /// A whiteboard event whose payload did not parse.
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Remote,
}

/// Notification that a pane's contents changed.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardChange {
    pub pane: BoardId,
    pub elements: Vec<DrawingElement>,
    pub sender: String,
    pub origin: ChangeOrigin,
}
