//! Room directory: the list of joinable rooms and their owners.
//!
//! The application server answers `GET /rooms` with a map of room name to
//! the owner's rtc wire identity. A failed refresh keeps the last good list.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::identity::bare_identity;

/// One listed room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEntry {
    pub name: String,
    /// Bare identity of the room's creator.
    pub owner_identity: String,
}

/// Client for the room list endpoint with a cached last-known list.
#[derive(Clone)]
pub struct RoomDirectory {
    base_url: String,
    http: reqwest::Client,
    rooms: Arc<RwLock<BTreeMap<String, String>>>,
}

impl RoomDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            base_url: base_url.into(),
            http,
            rooms: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn rooms_url(&self) -> String {
        format!("{}/rooms", self.base_url.trim_end_matches('/'))
    }

    /// Fetch the current list. On failure the previous list stays cached.
    pub async fn refresh(&self) -> Result<Vec<RoomEntry>, SessionError> {
        let url = self.rooms_url();
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SessionError::RoomListFetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Room list request rejected");
            return Err(SessionError::RoomListFetchFailed(format!("HTTP {status}")));
        }

        let raw: HashMap<String, String> = response.json().await.map_err(|e| {
            SessionError::RoomListFetchFailed(format!("malformed room list: {e}"))
        })?;

        let parsed: BTreeMap<String, String> = raw
            .into_iter()
            .map(|(room, owner)| (room, bare_identity(&owner)))
            .collect();

        debug!(rooms = parsed.len(), "Room list refreshed");
        *self.rooms.write().await = parsed;
        Ok(self.rooms().await)
    }

    /// Last successfully fetched list, ordered by room name.
    pub async fn rooms(&self) -> Vec<RoomEntry> {
        self.rooms
            .read()
            .await
            .iter()
            .map(|(name, owner)| RoomEntry {
                name: name.clone(),
                owner_identity: owner.clone(),
            })
            .collect()
    }

    pub async fn owner_of(&self, room: &str) -> Option<String> {
        self.rooms.read().await.get(room).cloned()
    }

    /// Refresh every `interval` until `cancel` fires.
    pub fn spawn_polling(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let directory = self.clone();
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Room directory polling started");
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = directory.refresh().await {
                            warn!(error = %e, "Room directory refresh failed");
                        }
                    }
                }
            }
            debug!("Room directory polling stopped");
        })
    }
}
