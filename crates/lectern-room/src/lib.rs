pub mod bus;
pub mod directory;
pub mod error;
pub mod identity;
pub mod owner_store;
pub mod protocol;
pub mod session;
pub mod token;
pub mod tracks;
pub mod transport;
pub mod whiteboard;

#[cfg(test)]
mod testing;

pub use bus::{BusClient, BusConfig, BusMessage, EventPublisher, PublishStatus, Subscription};
pub use directory::{RoomDirectory, RoomEntry};
pub use error::SessionError;
pub use identity::{bare_identity, Participant, Purpose, Role, ScopedIdentity};
pub use owner_store::{ClaimOutcome, OwnerStore};
pub use protocol::{board_topic, BoardId, CollaborationEvent, DrawingElement};
pub use session::{Room, RoomHandle, RoomSession, RoomState, SessionConfig};
pub use token::{
    mint_token_set, AccessTokenSet, TokenClient, TokenClientConfig, TokenEndpoint, TokenIntent,
    TokenProvider,
};
pub use tracks::{MediaHandle, TrackKind, TrackPublication, TrackRegistry};
pub use transport::{MediaConnection, MediaError, MediaLink, MediaTransport, TransportEvent};
pub use whiteboard::{
    BoardChange, ChangeOrigin, PaneBinding, RemoteOutcome, WhiteboardCoordinator, WhiteboardError,
};
