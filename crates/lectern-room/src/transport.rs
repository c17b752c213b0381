//! Seam to the external real-time media service.
//!
//! Connection negotiation, encoding, and media transit all happen on the
//! other side of these traits. The session core only needs to connect with
//! an rtc token, optionally enable local capture, observe track
//! subscribe/unsubscribe notifications, and disconnect.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::tracks::{MediaHandle, TrackKind};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MediaError(pub String);

/// A media track the transport subscribed us to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub sid: String,
    pub kind: TrackKind,
    pub media_handle: MediaHandle,
}

/// Publication metadata for a remote track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePublication {
    pub track_sid: String,
    pub kind: TrackKind,
}

/// The remote participant that published a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParticipant {
    /// Identity exactly as the transport reports it (may carry a purpose prefix).
    pub identity: String,
}

/// Notifications pushed by the transport, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    TrackSubscribed {
        track: RemoteTrack,
        publication: RemotePublication,
        participant: RemoteParticipant,
    },
    TrackUnsubscribed {
        track: RemoteTrack,
        publication: RemotePublication,
    },
}

/// A live connection to one room on the media service.
#[async_trait]
pub trait MediaConnection: Send + Sync {
    async fn enable_camera_and_microphone(&self) -> Result<(), MediaError>;

    /// Tear the connection down. Safe to call more than once.
    async fn disconnect(&self);
}

/// What a successful connect hands back: the connection and its ordered
/// event stream.
pub struct MediaLink {
    pub connection: Box<dyn MediaConnection>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Factory for media connections. One connection per join attempt.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn connect(&self, url: &str, token: &str) -> Result<MediaLink, MediaError>;
}
