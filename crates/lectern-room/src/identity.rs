//! Participant identities, roles, and purpose-scoped identities.
//!
//! The token service and the media transport both identify a participant by
//! a single string of the form `"<purpose> <identity>"` (e.g. `"rtc alice"`).
//! Inside this crate that string never travels on its own: it is parsed into
//! a [`ScopedIdentity`] at the boundary and rendered back only when a request
//! leaves the process.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Purpose
// ---------------------------------------------------------------------------

/// Subsystem a capability token grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    /// Real-time audio/video.
    Rtc,
    /// Text chat.
    Chat,
    /// Collaborative whiteboard.
    Whiteboard,
}

impl Purpose {
    pub const ALL: [Purpose; 3] = [Purpose::Rtc, Purpose::Chat, Purpose::Whiteboard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Rtc => "rtc",
            Purpose::Chat => "chat",
            Purpose::Whiteboard => "whiteboard",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rtc" => Ok(Purpose::Rtc),
            "chat" => Ok(Purpose::Chat),
            // Older token backends tag whiteboard identities with the canvas
            // library's name.
            "whiteboard" | "excalidraw" => Ok(Purpose::Whiteboard),
            other => Err(format!("unknown token purpose: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Scoped identity
// ---------------------------------------------------------------------------

/// A participant identity paired with the purpose it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedIdentity {
    pub purpose: Purpose,
    pub identity: String,
}

impl ScopedIdentity {
    pub fn new(purpose: Purpose, identity: impl Into<String>) -> Self {
        Self {
            purpose,
            identity: identity.into(),
        }
    }

    /// The form the token service and media transport expect.
    pub fn wire_name(&self) -> String {
        format!("{} {}", self.purpose, self.identity)
    }

    /// Parse a wire name such as `"rtc alice"`.
    ///
    /// Returns `None` when there is no recognizable purpose prefix.
    pub fn parse(wire: &str) -> Option<Self> {
        let (prefix, identity) = wire.trim().split_once(' ')?;
        let purpose = prefix.parse().ok()?;
        let identity = identity.trim();
        if identity.is_empty() {
            return None;
        }
        Some(Self::new(purpose, identity))
    }
}

impl fmt::Display for ScopedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.purpose, self.identity)
    }
}

/// Bare identity of a participant as reported by an external service.
///
/// Strings without a purpose prefix are taken as already bare.
pub fn bare_identity(wire: &str) -> String {
    ScopedIdentity::parse(wire)
        .map(|scoped| scoped.identity)
        .unwrap_or_else(|| wire.trim().to_string())
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Role a participant holds in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Created the room; the only publisher of live media.
    Owner,
    /// Any other participant.
    Attendee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Attendee => f.write_str("attendee"),
        }
    }
}

/// A member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub identity: String,
    pub role: Role,
}

impl Participant {
    /// Derive the role from the room's recorded owner.
    pub fn resolve(identity: impl Into<String>, owner_identity: &str) -> Self {
        let identity = identity.into();
        let role = if identity == owner_identity {
            Role::Owner
        } else {
            Role::Attendee
        };
        Self { identity, role }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    /// Scoped identity for requesting a token of the given purpose.
    pub fn scoped(&self, purpose: Purpose) -> ScopedIdentity {
        ScopedIdentity::new(purpose, self.identity.clone())
    }
}
