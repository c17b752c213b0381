//! Error taxonomy for room sessions and their external boundaries.

/// Errors surfaced by the session core.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("media connect failed: {0}")]
    MediaConnectFailed(String),

    #[error("room list fetch failed: {0}")]
    RoomListFetchFailed(String),

    #[error("room {0} is not listed in the directory")]
    UnknownRoom(String),

    #[error("room {room} is already owned by {owner}")]
    OwnerConflict { room: String, owner: String },

    #[error("owner store error: {0}")]
    Storage(String),

    #[error("a room session is already active")]
    AlreadyActive,

    #[error("join attempt superseded by leave")]
    Cancelled,

    /// Terminal error of a create/join. Session state has been rolled back.
    #[error("joining room {room} failed: {source}")]
    JoinFailed {
        room: String,
        #[source]
        source: Box<SessionError>,
    },
}

impl SessionError {
    pub(crate) fn join_failed(room: &str, source: SessionError) -> Self {
        SessionError::JoinFailed {
            room: room.to_string(),
            source: Box::new(source),
        }
    }

    /// The underlying error of a `JoinFailed`, or `self` otherwise.
    pub fn root_cause(&self) -> &SessionError {
        match self {
            SessionError::JoinFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = SessionError::TokenRequestFailed("room full".into());
        assert_eq!(err.to_string(), "token request failed: room full");

        let err = SessionError::OwnerConflict {
            room: "demo".into(),
            owner: "alice".into(),
        };
        assert_eq!(err.to_string(), "room demo is already owned by alice");
    }

    #[test]
    fn join_failed_exposes_root_cause() {
        let err = SessionError::join_failed(
            "demo",
            SessionError::TokenRequestFailed("room full".into()),
        );
        assert_eq!(
            err.to_string(),
            "joining room demo failed: token request failed: room full"
        );
        assert!(matches!(
            err.root_cause(),
            SessionError::TokenRequestFailed(reason) if reason == "room full"
        ));
    }

    #[test]
    fn root_cause_of_plain_error_is_itself() {
        let err = SessionError::Cancelled;
        assert!(matches!(err.root_cause(), SessionError::Cancelled));
    }
}
