//! Registry of remote media tracks for one room session.
//!
//! Driven purely by the transport's subscribe/unsubscribe notifications.
//! An entry exists for a track id iff the latest event for that id was a
//! subscribe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::bare_identity;
use crate::transport::TransportEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Opaque reference the media transport uses to locate a track's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPublication {
    pub track_id: String,
    /// Bare identity of the publishing participant.
    pub owner_identity: String,
    pub kind: TrackKind,
    pub media_handle: MediaHandle,
}

/// Live set of remote tracks keyed by track id.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: HashMap<String, TrackPublication>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one transport notification.
    ///
    /// Returns the publisher's bare identity for subscribe events.
    pub fn apply(&mut self, event: &TransportEvent) -> Option<String> {
        match event {
            TransportEvent::TrackSubscribed {
                track,
                publication,
                participant,
            } => {
                let owner_identity = bare_identity(&participant.identity);
                self.upsert(TrackPublication {
                    track_id: publication.track_sid.clone(),
                    owner_identity: owner_identity.clone(),
                    kind: publication.kind,
                    media_handle: track.media_handle,
                });
                Some(owner_identity)
            }
            TransportEvent::TrackUnsubscribed { publication, .. } => {
                self.remove(&publication.track_sid);
                None
            }
        }
    }

    /// Insert or replace. Returns `true` if the id was not present.
    pub fn upsert(&mut self, publication: TrackPublication) -> bool {
        self.tracks
            .insert(publication.track_id.clone(), publication)
            .is_none()
    }

    /// Remove by id. Missing ids are a no-op.
    pub fn remove(&mut self, track_id: &str) -> Option<TrackPublication> {
        self.tracks.remove(track_id)
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackPublication> {
        self.tracks.get(track_id)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.contains_key(track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks published by `owner_identity`, ordered by track id.
    pub fn owned_by(&self, owner_identity: &str) -> Vec<TrackPublication> {
        let mut owned: Vec<_> = self
            .tracks
            .values()
            .filter(|t| t.owner_identity == owner_identity)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.track_id.cmp(&b.track_id));
        owned
    }

    /// Every track, ordered by track id.
    pub fn all(&self) -> Vec<TrackPublication> {
        let mut all: Vec<_> = self.tracks.values().cloned().collect();
        all.sort_by(|a, b| a.track_id.cmp(&b.track_id));
        all
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
