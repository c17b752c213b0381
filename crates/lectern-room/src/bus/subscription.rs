//! Topic subscriptions and their explicit cancellation handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;

use super::client::BusShared;
use super::types::{BusCommand, BusMessage};

pub(crate) type Handler = Arc<dyn Fn(&BusMessage) + Send + Sync>;

/// A registered handler plus the flag its [`Subscription`] flips on cancel.
#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) handler: Handler,
    pub(crate) active: Arc<AtomicBool>,
}

/// Handlers keyed by topic, then by subscription id.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    topics: HashMap<String, HashMap<String, Entry>>,
}

impl SubscriptionTable {
    /// Returns `true` when this is the first handler for `topic`.
    pub(crate) fn insert(&mut self, topic: &str, id: &str, entry: Entry) -> bool {
        let handlers = self.topics.entry(topic.to_string()).or_default();
        let first = handlers.is_empty();
        handlers.insert(id.to_string(), entry);
        first
    }

    /// Returns `true` when `topic` has no handlers left.
    pub(crate) fn remove(&mut self, topic: &str, id: &str) -> bool {
        let Some(handlers) = self.topics.get_mut(topic) else {
            return false;
        };
        if handlers.remove(id).is_none() {
            return false;
        }
        if handlers.is_empty() {
            self.topics.remove(topic);
            return true;
        }
        false
    }

    pub(crate) fn entries(&self, topic: &str) -> Vec<Entry> {
        self.topics
            .get(topic)
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }
}

/// Lock the table, recovering from a handler that panicked mid-dispatch.
pub(crate) fn lock_table(table: &Mutex<SubscriptionTable>) -> MutexGuard<'_, SubscriptionTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to one topic subscription.
///
/// Delivery continues until [`Subscription::cancel`] is called; dropping the
/// handle does not unsubscribe.
pub struct Subscription {
    id: String,
    topic: String,
    active: Arc<AtomicBool>,
    shared: Weak<BusShared>,
}

impl Subscription {
    pub(crate) fn new(
        id: String,
        topic: String,
        active: Arc<AtomicBool>,
        shared: Weak<BusShared>,
    ) -> Self {
        Self {
            id,
            topic,
            active,
            shared,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop delivery to this handler. Calling it again does nothing.
    pub fn cancel(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let topic_empty = lock_table(&shared.subscriptions).remove(&self.topic, &self.id);
        debug!(topic = %self.topic, id = %self.id, "Subscription cancelled");

        if topic_empty && shared.is_connected() {
            let _ = shared.command_tx.try_send(BusCommand::Leave {
                topic: self.topic.clone(),
            });
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry {
            handler: Arc::new(|_| {}),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    #[test]
    fn first_and_last_handler_are_reported() {
        let mut table = SubscriptionTable::default();
        assert!(table.insert("t", "a", entry()));
        assert!(!table.insert("t", "b", entry()));
        assert_eq!(table.entries("t").len(), 2);

        assert!(!table.remove("t", "a"));
        assert!(table.has_topic("t"));
        assert!(table.remove("t", "b"));
        assert!(!table.has_topic("t"));
    }

    #[test]
    fn removing_unknown_is_noop() {
        let mut table = SubscriptionTable::default();
        table.insert("t", "a", entry());
        assert!(!table.remove("t", "zzz"));
        assert!(!table.remove("other", "a"));
        assert_eq!(table.topics(), vec!["t".to_string()]);
    }
}
