//! Room session: create/join/leave with rollback and generation-tagged
//! attempts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lectern_common::new_correlation_id;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::directory::RoomDirectory;
use crate::error::SessionError;
use crate::identity::{Participant, Role};
use crate::owner_store::{ClaimOutcome, OwnerStore};
use crate::token::{mint_token_set, AccessTokenSet, TokenIntent, TokenProvider};
use crate::tracks::{TrackPublication, TrackRegistry};
use crate::transport::{MediaConnection, MediaTransport, TransportEvent};

use super::types::{Room, RoomHandle, RoomState, SessionConfig};

/// Mutable session state. Every create/join/leave bumps or checks
/// `generation` under this lock.
struct SessionInner {
    generation: u64,
    state: RoomState,
    room: Option<String>,
    owner_identity: Option<String>,
    participant: Option<Participant>,
    tokens: Option<AccessTokenSet>,
    connection: Option<Arc<dyn MediaConnection>>,
    pump: Option<JoinHandle<()>>,
    registry: TrackRegistry,
    joined_at: Option<DateTime<Utc>>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            generation: 0,
            state: RoomState::Unjoined,
            room: None,
            owner_identity: None,
            participant: None,
            tokens: None,
            connection: None,
            pump: None,
            registry: TrackRegistry::new(),
            joined_at: None,
        }
    }

    fn clear_membership(&mut self) {
        self.room = None;
        self.owner_identity = None;
        self.participant = None;
        self.tokens = None;
        self.registry.clear();
        self.joined_at = None;
    }
}

/// How to put the owner store back if an attempt fails.
enum OwnerUndo {
    Nothing,
    /// The attempt wrote this record.
    Clear(String),
    /// The attempt replaced `previous` with `identity`.
    Restore { identity: String, previous: String },
    /// The record predates the attempt; only the hold is new.
    Release(String),
}

/// One in-flight create/join.
struct Attempt {
    id: String,
    generation: u64,
    room: String,
    owner_identity: String,
    participant: Participant,
    previous_state: RoomState,
    owner_undo: OwnerUndo,
}

/// A participant's membership in at most one room at a time.
pub struct RoomSession {
    config: SessionConfig,
    tokens: Arc<dyn TokenProvider>,
    transport: Arc<dyn MediaTransport>,
    owners: OwnerStore,
    inner: Arc<Mutex<SessionInner>>,
}

impl RoomSession {
    pub fn new(
        config: SessionConfig,
        tokens: Arc<dyn TokenProvider>,
        transport: Arc<dyn MediaTransport>,
        owners: OwnerStore,
    ) -> Self {
        Self {
            config,
            tokens,
            transport,
            owners,
            inner: Arc::new(Mutex::new(SessionInner::new())),
        }
    }

    pub fn owners(&self) -> &OwnerStore {
        &self.owners
    }

    // -----------------------------------------------------------------------
    // Create / join
    // -----------------------------------------------------------------------

    /// Create `room` as its owner and start publishing camera + microphone.
    pub async fn create(&self, room: &str, identity: &str) -> Result<RoomHandle, SessionError> {
        let mut attempt = self
            .begin(room, identity, identity)
            .await
            .map_err(|e| SessionError::join_failed(room, e))?;
        info!(room, identity, attempt = %attempt.id, "Creating room");

        match self.run_create(&mut attempt).await {
            Ok(handle) => {
                info!(room, identity, attempt = %attempt.id, "Room created");
                Ok(handle)
            }
            Err(e) => Err(self.fail(attempt, e).await),
        }
    }

    /// Join an existing `room` whose creator is `owner_identity`.
    pub async fn join(
        &self,
        room: &str,
        owner_identity: &str,
        identity: &str,
    ) -> Result<RoomHandle, SessionError> {
        let mut attempt = self
            .begin(room, owner_identity, identity)
            .await
            .map_err(|e| SessionError::join_failed(room, e))?;
        info!(room, identity, owner = owner_identity, attempt = %attempt.id, "Joining room");

        match self.run_join(&mut attempt).await {
            Ok(handle) => {
                info!(room, identity, role = %handle.participant.role, attempt = %attempt.id, "Room joined");
                Ok(handle)
            }
            Err(e) => Err(self.fail(attempt, e).await),
        }
    }

    /// Join `room` using the owner listed in `directory`.
    pub async fn join_from_directory(
        &self,
        directory: &RoomDirectory,
        room: &str,
        identity: &str,
    ) -> Result<RoomHandle, SessionError> {
        let Some(owner) = directory.owner_of(room).await else {
            return Err(SessionError::join_failed(
                room,
                SessionError::UnknownRoom(room.to_string()),
            ));
        };
        self.join(room, &owner, identity).await
    }

    async fn run_create(&self, attempt: &mut Attempt) -> Result<RoomHandle, SessionError> {
        let identity = attempt.participant.identity.clone();
        match self.owners.claim(&attempt.room, &identity).await? {
            ClaimOutcome::Claimed => attempt.owner_undo = OwnerUndo::Clear(identity.clone()),
            ClaimOutcome::AlreadyOwner => {
                attempt.owner_undo = OwnerUndo::Release(identity.clone());
            }
            ClaimOutcome::Replaced(previous) => {
                info!(room = %attempt.room, %previous, "Taking over stale owner record");
                attempt.owner_undo = OwnerUndo::Restore {
                    identity: identity.clone(),
                    previous,
                };
            }
            ClaimOutcome::OwnedBy(owner) => {
                return Err(SessionError::OwnerConflict {
                    room: attempt.room.clone(),
                    owner,
                });
            }
        }

        let tokens =
            mint_token_set(&*self.tokens, TokenIntent::Create, &attempt.room, &identity).await?;
        self.ensure_current(attempt).await?;

        let connection = self.connect(attempt, &tokens).await?;
        connection
            .enable_camera_and_microphone()
            .await
            .map_err(|e| SessionError::MediaConnectFailed(format!("enabling capture: {e}")))?;

        self.finish(attempt, tokens).await
    }

    async fn run_join(&self, attempt: &mut Attempt) -> Result<RoomHandle, SessionError> {
        if self
            .owners
            .record_if_absent(&attempt.room, &attempt.owner_identity)
            .await?
        {
            attempt.owner_undo = OwnerUndo::Clear(attempt.owner_identity.clone());
        }
        if attempt.participant.is_owner()
            && self
                .owners
                .hold(&attempt.room, &attempt.participant.identity)
                .await
            && matches!(attempt.owner_undo, OwnerUndo::Nothing)
        {
            attempt.owner_undo = OwnerUndo::Release(attempt.participant.identity.clone());
        }

        let tokens = mint_token_set(
            &*self.tokens,
            TokenIntent::Join,
            &attempt.room,
            &attempt.participant.identity,
        )
        .await?;
        self.ensure_current(attempt).await?;

        self.connect(attempt, &tokens).await?;
        self.finish(attempt, tokens).await
    }

    // -----------------------------------------------------------------------
    // Attempt steps
    // -----------------------------------------------------------------------

    async fn begin(
        &self,
        room: &str,
        owner_identity: &str,
        identity: &str,
    ) -> Result<Attempt, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state.is_active() {
            return Err(SessionError::AlreadyActive);
        }

        let previous_state = inner.state;
        let participant = Participant::resolve(identity, owner_identity);
        inner.generation += 1;
        inner.state = RoomState::Connecting;
        inner.room = Some(room.to_string());
        inner.owner_identity = Some(owner_identity.to_string());
        inner.participant = Some(participant.clone());

        Ok(Attempt {
            id: new_correlation_id(),
            generation: inner.generation,
            room: room.to_string(),
            owner_identity: owner_identity.to_string(),
            participant,
            previous_state,
            owner_undo: OwnerUndo::Nothing,
        })
    }

    async fn ensure_current(&self, attempt: &Attempt) -> Result<(), SessionError> {
        if self.inner.lock().await.generation == attempt.generation {
            Ok(())
        } else {
            debug!(room = %attempt.room, attempt = %attempt.id, "Attempt superseded");
            Err(SessionError::Cancelled)
        }
    }

    /// Connect with the rtc token and start the event pump. A connection
    /// that completes after the attempt was superseded is torn down.
    async fn connect(
        &self,
        attempt: &Attempt,
        tokens: &AccessTokenSet,
    ) -> Result<Arc<dyn MediaConnection>, SessionError> {
        let link = self
            .transport
            .connect(&self.config.media_url, &tokens.rtc)
            .await
            .map_err(|e| SessionError::MediaConnectFailed(e.to_string()))?;
        let connection: Arc<dyn MediaConnection> = Arc::from(link.connection);

        let mut inner = self.inner.lock().await;
        if inner.generation != attempt.generation {
            drop(inner);
            debug!(room = %attempt.room, attempt = %attempt.id, "Discarding stale media connection");
            connection.disconnect().await;
            return Err(SessionError::Cancelled);
        }

        inner.connection = Some(Arc::clone(&connection));
        inner.pump = Some(self.spawn_pump(attempt, link.events));
        Ok(connection)
    }

    async fn finish(
        &self,
        attempt: &Attempt,
        tokens: AccessTokenSet,
    ) -> Result<RoomHandle, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.generation != attempt.generation {
            return Err(SessionError::Cancelled);
        }

        let joined_at = Utc::now();
        inner.state = RoomState::Joined;
        inner.tokens = Some(tokens.clone());
        inner.joined_at = Some(joined_at);

        Ok(RoomHandle {
            room: Room {
                name: attempt.room.clone(),
                owner_identity: attempt.owner_identity.clone(),
                state: RoomState::Joined,
            },
            participant: attempt.participant.clone(),
            tokens,
            joined_at,
        })
    }

    /// Roll back a failed attempt and wrap its error.
    async fn fail(&self, attempt: Attempt, error: SessionError) -> SessionError {
        warn!(room = %attempt.room, attempt = %attempt.id, error = %error, "Join attempt failed");

        let (connection, pump, newer_active) = {
            let mut inner = self.inner.lock().await;
            if inner.generation == attempt.generation {
                let connection = inner.connection.take();
                let pump = inner.pump.take();
                inner.clear_membership();
                inner.state = attempt.previous_state;
                (connection, pump, false)
            } else {
                (None, None, inner.state.is_active())
            }
        };

        stop_pump(pump).await;
        if let Some(connection) = connection {
            connection.disconnect().await;
        }

        if !newer_active {
            self.undo_owner(&attempt).await;
        }

        SessionError::join_failed(&attempt.room, error)
    }

    async fn undo_owner(&self, attempt: &Attempt) {
        let room = attempt.room.as_str();
        let result = match &attempt.owner_undo {
            OwnerUndo::Nothing => Ok(false),
            OwnerUndo::Clear(owner) => self.owners.clear_if_owner(room, owner).await,
            OwnerUndo::Restore { identity, previous } => {
                self.owners.restore(room, identity, previous).await
            }
            OwnerUndo::Release(owner) => {
                self.owners.release(room, owner).await;
                Ok(true)
            }
        };
        if let Err(e) = result {
            warn!(room, error = %e, "Failed to roll back owner record");
        }
    }

    /// Apply transport events in order for as long as the attempt is current.
    fn spawn_pump(
        &self,
        attempt: &Attempt,
        mut events: mpsc::Receiver<TransportEvent>,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let owners = self.owners.clone();
        let generation = attempt.generation;
        let room = attempt.room.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                // The store write stays under the session lock so a leave()
                // cannot clear the record in between.
                let mut guard = inner.lock().await;
                if guard.generation != generation {
                    break;
                }
                let Some(publisher) = guard.registry.apply(&event) else {
                    continue;
                };

                // First publisher seen becomes owner only if none is recorded.
                match owners.record_if_absent(&room, &publisher).await {
                    Ok(true) => {
                        guard.owner_identity = Some(publisher.clone());
                        if let Some(participant) = guard.participant.take() {
                            guard.participant =
                                Some(Participant::resolve(participant.identity, &publisher));
                        }
                        info!(room = %room, owner = %publisher, "Owner recorded from track");
                    }
                    Ok(false) => {}
                    Err(e) => warn!(room = %room, error = %e, "Failed to record owner"),
                }
            }
            debug!(room = %room, "Media event pump stopped");
        })
    }

    // -----------------------------------------------------------------------
    // Leave
    // -----------------------------------------------------------------------

    /// Leave the current room, or abandon an in-flight create/join.
    ///
    /// Safe to call at any time. The persisted owner record is cleared only
    /// when the leaving participant is the recorded owner.
    pub async fn leave(&self) {
        let (connection, pump, membership, was_active) = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            let was_active = inner.state.is_active();
            let connection = inner.connection.take();
            let pump = inner.pump.take();
            let membership = inner.room.clone().zip(inner.participant.clone());
            inner.clear_membership();
            if was_active {
                inner.state = RoomState::Left;
            }
            (connection, pump, membership, was_active)
        };

        stop_pump(pump).await;
        if let Some(connection) = connection {
            connection.disconnect().await;
        }

        let Some((room, participant)) = membership else {
            debug!("Leave with no active room");
            return;
        };

        match self
            .owners
            .clear_if_owner(&room, &participant.identity)
            .await
        {
            Ok(true) => debug!(room = %room, "Owner record cleared"),
            Ok(false) => {}
            Err(e) => warn!(room = %room, error = %e, "Failed to clear owner record"),
        }

        if was_active {
            info!(room = %room, identity = %participant.identity, "Left room");
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn state(&self) -> RoomState {
        self.inner.lock().await.state
    }

    pub async fn room(&self) -> Option<Room> {
        let inner = self.inner.lock().await;
        Some(Room {
            name: inner.room.clone()?,
            owner_identity: inner.owner_identity.clone()?,
            state: inner.state,
        })
    }

    /// The current membership, once fully joined.
    pub async fn handle(&self) -> Option<RoomHandle> {
        let inner = self.inner.lock().await;
        if inner.state != RoomState::Joined {
            return None;
        }
        Some(RoomHandle {
            room: Room {
                name: inner.room.clone()?,
                owner_identity: inner.owner_identity.clone()?,
                state: inner.state,
            },
            participant: inner.participant.clone()?,
            tokens: inner.tokens.clone()?,
            joined_at: inner.joined_at?,
        })
    }

    pub async fn participant(&self) -> Option<Participant> {
        self.inner.lock().await.participant.clone()
    }

    pub async fn role(&self) -> Option<Role> {
        self.inner.lock().await.participant.as_ref().map(|p| p.role)
    }

    pub async fn tokens(&self) -> Option<AccessTokenSet> {
        self.inner.lock().await.tokens.clone()
    }

    /// Tracks published by the room owner. This is what attendees render.
    pub async fn owner_tracks(&self) -> Vec<TrackPublication> {
        let inner = self.inner.lock().await;
        match inner.owner_identity.as_deref() {
            Some(owner) => inner.registry.owned_by(owner),
            None => Vec::new(),
        }
    }

    pub async fn tracks(&self) -> Vec<TrackPublication> {
        self.inner.lock().await.registry.all()
    }
}

/// Abort the event pump and wait until it has stopped.
async fn stop_pump(pump: Option<JoinHandle<()>>) {
    if let Some(pump) = pump {
        pump.abort();
        let _ = pump.await;
    }
}
