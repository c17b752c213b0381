//! Topic store: maps topics to the connections that joined them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

/// Broker-assigned connection id.
pub type ConnId = u64;

/// Thread-safe topic membership table.
#[derive(Clone, Default)]
pub struct TopicStore {
    topics: Arc<RwLock<HashMap<String, HashMap<ConnId, mpsc::Sender<String>>>>>,
}

impl TopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn` to `topic`. Returns false if it was already a member.
    pub async fn join(&self, topic: &str, conn: ConnId, tx: mpsc::Sender<String>) -> bool {
        let mut map = self.topics.write().await;
        map.entry(topic.to_string())
            .or_default()
            .insert(conn, tx)
            .is_none()
    }

    /// Remove `conn` from `topic`. Returns true if it was a member.
    pub async fn leave(&self, topic: &str, conn: ConnId) -> bool {
        let mut map = self.topics.write().await;
        let Some(members) = map.get_mut(topic) else {
            return false;
        };
        let removed = members.remove(&conn).is_some();
        if members.is_empty() {
            map.remove(topic);
        }
        removed
    }

    /// Drop every membership held by `conn`.
    pub async fn remove_connection(&self, conn: ConnId) {
        let mut map = self.topics.write().await;
        map.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    /// Senders for every member of `topic` other than `conn`.
    pub async fn peers(&self, topic: &str, conn: ConnId) -> Vec<mpsc::Sender<String>> {
        let map = self.topics.read().await;
        map.get(topic)
            .map(|members| {
                members
                    .iter()
                    .filter(|(id, _)| **id != conn)
                    .map(|(_, tx)| tx.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of connections joined to `topic`.
    pub async fn member_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Number of topics with at least one member.
    pub async fn count(&self) -> usize {
        self.topics.read().await.len()
    }
}
