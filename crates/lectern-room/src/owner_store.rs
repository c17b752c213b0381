//! Durable record of which identity owns each room.
//!
//! One lock guards every read-compare-write so that two local join paths can
//! never both believe they set the owner. The file form is a flat JSON map
//! `{room: identity}` written via temp file + rename.
//!
//! A record is *held* while its owner has a live session in this process.
//! Holds are never persisted: a record left behind by an earlier run, or
//! remembered by an attendee, can be taken over by the next `claim`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SessionError;

/// Result of [`OwnerStore::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// No owner was recorded; `identity` now owns the room.
    Claimed,
    /// `identity` was already the recorded owner.
    AlreadyOwner,
    /// An unheld record naming someone else was replaced. Carries the
    /// previous owner.
    Replaced(String),
    /// Someone else owns the room and holds it. Nothing changed.
    OwnedBy(String),
}

struct Inner {
    path: Option<PathBuf>,
    owners: HashMap<String, String>,
    held: HashSet<String>,
}

/// Keyed owner records, shared by clones.
#[derive(Clone)]
pub struct OwnerStore {
    inner: Arc<Mutex<Inner>>,
}

impl OwnerStore {
    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::with_state(None, HashMap::new())
    }

    /// Open (or start) a file-backed store. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let owners = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| SessionError::Storage(format!("{}: {e}", path.display())))?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| SessionError::Storage(format!("{}: {e}", path.display())))?
            }
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), rooms = owners.len(), "Owner store opened");
        Ok(Self::with_state(Some(path), owners))
    }

    /// `<data_dir>/lectern/owners.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("lectern").join("owners.json"))
    }

    fn with_state(path: Option<PathBuf>, owners: HashMap<String, String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                path,
                owners,
                held: HashSet::new(),
            })),
        }
    }

    pub async fn owner(&self, room: &str) -> Option<String> {
        self.inner.lock().await.owners.get(room).cloned()
    }

    /// Record and hold `identity` as owner unless another identity holds
    /// the room.
    pub async fn claim(&self, room: &str, identity: &str) -> Result<ClaimOutcome, SessionError> {
        let mut inner = self.inner.lock().await;
        let current = inner.owners.get(room).cloned();
        let previous = match current {
            Some(current) if current == identity => {
                inner.held.insert(room.to_string());
                return Ok(ClaimOutcome::AlreadyOwner);
            }
            Some(current) if inner.held.contains(room) => {
                return Ok(ClaimOutcome::OwnedBy(current));
            }
            other => other,
        };

        inner.write(room, Some(identity.to_string()))?;
        inner.held.insert(room.to_string());
        match previous {
            Some(previous) => {
                debug!(room, owner = identity, %previous, "Stale owner record replaced");
                Ok(ClaimOutcome::Replaced(previous))
            }
            None => {
                debug!(room, owner = identity, "Owner claimed");
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    /// Hold the record while `identity` is its owner. Returns `true` if
    /// `identity` is the recorded owner.
    pub async fn hold(&self, room: &str, identity: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.owners.get(room).map(String::as_str) != Some(identity) {
            return false;
        }
        inner.held.insert(room.to_string());
        true
    }

    /// Drop the hold `identity` has on `room`, keeping the record.
    pub async fn release(&self, room: &str, identity: &str) {
        let mut inner = self.inner.lock().await;
        if inner.owners.get(room).map(String::as_str) == Some(identity) {
            inner.held.remove(room);
        }
    }

    pub async fn is_held(&self, room: &str) -> bool {
        self.inner.lock().await.held.contains(room)
    }

    /// Put `previous` back if `identity` is still the recorded owner. Used to
    /// undo a [`ClaimOutcome::Replaced`].
    pub async fn restore(
        &self,
        room: &str,
        identity: &str,
        previous: &str,
    ) -> Result<bool, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.owners.get(room).map(String::as_str) != Some(identity) {
            return Ok(false);
        }
        inner.write(room, Some(previous.to_string()))?;
        inner.held.remove(room);
        debug!(room, owner = previous, "Owner record restored");
        Ok(true)
    }

    /// Record `identity` only when no owner is recorded. Returns `true` if
    /// this call wrote the record.
    pub async fn record_if_absent(&self, room: &str, identity: &str) -> Result<bool, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.owners.contains_key(room) {
            return Ok(false);
        }
        inner.write(room, Some(identity.to_string()))?;
        debug!(room, owner = identity, "Owner recorded");
        Ok(true)
    }

    /// Remove the record only if `identity` is the recorded owner.
    pub async fn clear_if_owner(&self, room: &str, identity: &str) -> Result<bool, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.owners.get(room).map(String::as_str) != Some(identity) {
            return Ok(false);
        }
        inner.write(room, None)?;
        inner.held.remove(room);
        debug!(room, owner = identity, "Owner cleared");
        Ok(true)
    }

    /// Snapshot of every record.
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.inner.lock().await.owners.clone()
    }
}

impl Inner {
    /// Set or remove one record and persist. On a failed write the map is
    /// left as it was.
    fn write(&mut self, room: &str, owner: Option<String>) -> Result<(), SessionError> {
        let previous = match owner {
            Some(owner) => self.owners.insert(room.to_string(), owner),
            None => self.owners.remove(room),
        };
        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => self.owners.insert(room.to_string(), previous),
                None => self.owners.remove(room),
            };
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_atomic(path, &self.owners).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to persist owner store");
            SessionError::Storage(format!("{}: {e}", path.display()))
        })
    }
}

fn write_atomic(path: &Path, owners: &HashMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(owners)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claim_then_conflict() {
        let store = OwnerStore::in_memory();
        assert_eq!(
            store.claim("demo", "alice").await.unwrap(),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            store.claim("demo", "alice").await.unwrap(),
            ClaimOutcome::AlreadyOwner
        );
        assert_eq!(
            store.claim("demo", "bob").await.unwrap(),
            ClaimOutcome::OwnedBy("alice".into())
        );
        assert_eq!(store.owner("demo").await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn unheld_record_is_replaced() {
        let store = OwnerStore::in_memory();
        // An attendee remembers the owner without holding the room.
        assert!(store.record_if_absent("demo", "alice").await.unwrap());
        assert!(!store.is_held("demo").await);

        assert_eq!(
            store.claim("demo", "bob").await.unwrap(),
            ClaimOutcome::Replaced("alice".into())
        );
        assert_eq!(store.owner("demo").await.as_deref(), Some("bob"));
        assert!(store.is_held("demo").await);

        assert!(store.restore("demo", "bob", "alice").await.unwrap());
        assert_eq!(store.owner("demo").await.as_deref(), Some("alice"));
        assert!(!store.is_held("demo").await);
    }

    #[tokio::test]
    async fn release_keeps_record_but_allows_takeover() {
        let store = OwnerStore::in_memory();
        store.claim("demo", "alice").await.unwrap();
        store.release("demo", "mallory").await;
        assert!(store.is_held("demo").await);

        store.release("demo", "alice").await;
        assert_eq!(store.owner("demo").await.as_deref(), Some("alice"));
        assert_eq!(
            store.claim("demo", "bob").await.unwrap(),
            ClaimOutcome::Replaced("alice".into())
        );
    }

    #[tokio::test]
    async fn hold_requires_recorded_owner() {
        let store = OwnerStore::in_memory();
        assert!(!store.hold("demo", "alice").await);
        store.record_if_absent("demo", "alice").await.unwrap();
        assert!(!store.hold("demo", "bob").await);
        assert!(store.hold("demo", "alice").await);
        assert_eq!(
            store.claim("demo", "bob").await.unwrap(),
            ClaimOutcome::OwnedBy("alice".into())
        );
    }

    #[tokio::test]
    async fn record_if_absent_never_overwrites() {
        let store = OwnerStore::in_memory();
        assert!(store.record_if_absent("demo", "alice").await.unwrap());
        assert!(!store.record_if_absent("demo", "mallory").await.unwrap());
        assert_eq!(store.owner("demo").await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn clear_only_by_owner() {
        let store = OwnerStore::in_memory();
        store.claim("demo", "alice").await.unwrap();
        assert!(!store.clear_if_owner("demo", "bob").await.unwrap());
        assert_eq!(store.owner("demo").await.as_deref(), Some("alice"));
        assert!(store.clear_if_owner("demo", "alice").await.unwrap());
        assert!(store.owner("demo").await.is_none());
        assert!(!store.clear_if_owner("demo", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_claims_yield_single_owner() {
        let store = OwnerStore::in_memory();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.claim("demo", &format!("user{i}")).await.unwrap()
            }));
        }
        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap() == ClaimOutcome::Claimed {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("owners.json");

        let store = OwnerStore::open(&path).unwrap();
        store.claim("demo", "alice").await.unwrap();
        store.claim("other", "carol").await.unwrap();
        store.clear_if_owner("other", "carol").await.unwrap();
        drop(store);

        let reopened = OwnerStore::open(&path).unwrap();
        assert_eq!(reopened.owner("demo").await.as_deref(), Some("alice"));
        assert!(reopened.owner("other").await.is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = OwnerStore::open(dir.path().join("owners.json")).unwrap();
        assert!(store.snapshot().await.is_empty());
    }

    #[test]
    fn open_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owners.json");
        std::fs::write(&path, "not json {{{").unwrap();
        assert!(matches!(
            OwnerStore::open(&path),
            Err(SessionError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn failed_persist_reverts_claim() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go makes the rename fail.
        let path = dir.path().join("owners.json");
        std::fs::create_dir_all(path.join("blocker")).unwrap();
        let store = OwnerStore {
            inner: Arc::new(Mutex::new(Inner {
                path: Some(path),
                owners: HashMap::new(),
                held: HashSet::new(),
            })),
        };

        let result = store.claim("demo", "alice").await;
        assert!(matches!(result, Err(SessionError::Storage(_))));
        assert!(store.owner("demo").await.is_none());
    }
}
