//! Whiteboard coordinator: role-gated panes synchronized over the bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::bus::{BusClient, BusMessage, EventPublisher, PublishStatus, Subscription};
use crate::identity::{Participant, Role};
use crate::protocol::{board_topic, events, BoardId, CollaborationEvent, DrawingElement};

use super::types::{BoardChange, ChangeOrigin, PaneBinding, RemoteOutcome, WhiteboardError};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Local copy of both panes for one room, plus the bus wiring to keep the
/// pane we do not own in sync with its owner.
pub struct WhiteboardCoordinator {
    room: String,
    topic: String,
    participant: Participant,
    binding: PaneBinding,
    publisher: Arc<dyn EventPublisher>,
    panes: Mutex<HashMap<BoardId, Vec<DrawingElement>>>,
    changes: broadcast::Sender<BoardChange>,
    subscription: Mutex<Option<Subscription>>,
}

impl WhiteboardCoordinator {
    pub fn new(
        room: impl Into<String>,
        participant: Participant,
        binding: PaneBinding,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let room = room.into();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            topic: board_topic(&room),
            room,
            participant,
            binding,
            publisher,
            panes: Mutex::new(BoardId::ALL.into_iter().map(|p| (p, Vec::new())).collect()),
            changes,
            subscription: Mutex::new(None),
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn role(&self) -> Role {
        self.participant.role
    }

    /// The pane the local participant may draw on.
    pub fn owned_pane(&self) -> BoardId {
        self.binding.pane_for(self.participant.role)
    }

    pub fn is_writable(&self, pane: BoardId) -> bool {
        self.binding.owns(self.participant.role, pane)
    }

    /// Current contents of `pane`.
    pub fn pane(&self, pane: BoardId) -> Vec<DrawingElement> {
        self.lock_panes().get(&pane).cloned().unwrap_or_default()
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<BoardChange> {
        self.changes.subscribe()
    }

    // -----------------------------------------------------------------------
    // Local edits
    // -----------------------------------------------------------------------

    /// Replace `pane` with `elements` and broadcast the snapshot.
    ///
    /// The local copy is updated before publishing; a suppressed publish does
    /// not roll it back.
    pub fn local_edit(
        &self,
        pane: BoardId,
        elements: Vec<DrawingElement>,
    ) -> Result<PublishStatus, WhiteboardError> {
        if !self.is_writable(pane) {
            return Err(WhiteboardError::ReadOnlyPane {
                pane,
                role: self.participant.role,
            });
        }

        self.lock_panes().insert(pane, elements.clone());
        self.notify(BoardChange {
            pane,
            elements: elements.clone(),
            sender: self.participant.identity.clone(),
            origin: ChangeOrigin::Local,
        });

        let event = CollaborationEvent::board_update(pane, elements, &self.participant.identity);
        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(room = %self.room, error = %e, "Failed to encode board update");
                return Ok(PublishStatus::Suppressed);
            }
        };

        let status = self
            .publisher
            .publish(&self.topic, event.event_name(), payload);
        debug!(room = %self.room, %pane, ?status, "Local board edit");
        Ok(status)
    }

    // -----------------------------------------------------------------------
    // Remote updates
    // -----------------------------------------------------------------------

    /// Apply a snapshot received from a peer.
    pub fn apply_remote(&self, event: CollaborationEvent) -> RemoteOutcome {
        match event {
            CollaborationEvent::BoardUpdate {
                board_id,
                elements,
                sender,
            } => {
                if self.is_writable(board_id) {
                    debug!(room = %self.room, pane = %board_id, %sender, "Ignoring update for own pane");
                    return RemoteOutcome::IgnoredOwnPane;
                }
                self.lock_panes().insert(board_id, elements.clone());
                self.notify(BoardChange {
                    pane: board_id,
                    elements,
                    sender,
                    origin: ChangeOrigin::Remote,
                });
                RemoteOutcome::Applied
            }
        }
    }

    /// Decode a bus message and apply it.
    pub fn handle_message(&self, message: &BusMessage) -> RemoteOutcome {
        if message.event != events::BOARD_UPDATE {
            debug!(room = %self.room, event = %message.event, "Ignoring non-board event");
            return RemoteOutcome::Unrecognized;
        }
        match serde_json::from_value::<CollaborationEvent>(message.payload.clone()) {
            Ok(event) => self.apply_remote(event),
            Err(e) => {
                warn!(room = %self.room, error = %e, "Dropping malformed board update");
                RemoteOutcome::Malformed
            }
        }
    }

    // -----------------------------------------------------------------------
    // Bus wiring
    // -----------------------------------------------------------------------

    /// Start receiving the room's board updates from `bus`. Re-attaching
    /// replaces the previous subscription.
    pub fn attach(self: &Arc<Self>, bus: &BusClient) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscription = bus.subscribe(&self.topic, move |message| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.handle_message(message);
            }
        });

        let previous = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(subscription);
        if let Some(previous) = previous {
            previous.cancel();
        }
        info!(room = %self.room, topic = %self.topic, "Whiteboard attached");
    }

    /// Stop receiving board updates. Safe when not attached.
    pub fn detach(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.cancel();
            info!(room = %self.room, "Whiteboard detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn lock_panes(&self) -> MutexGuard<'_, HashMap<BoardId, Vec<DrawingElement>>> {
        self.panes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, change: BoardChange) {
        // No receivers is fine.
        let _ = self.changes.send(change);
    }
}

impl Drop for WhiteboardCoordinator {
    fn drop(&mut self) {
        self.detach();
    }
}
