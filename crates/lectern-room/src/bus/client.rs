//! Public handle for the process-wide collaboration bus connection.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use lectern_common::new_id;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::connection_loop;
use super::subscription::{lock_table, Entry, Subscription, SubscriptionTable};
use super::types::{BusCommand, BusConfig, BusMessage, PublishStatus};

/// Anything that can put an event on a topic.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: &str, event: &str, payload: serde_json::Value) -> PublishStatus;
}

/// State shared between the client handle, its subscriptions, and the
/// background connection task.
pub(crate) struct BusShared {
    pub(crate) connected: watch::Sender<bool>,
    pub(crate) subscriptions: Mutex<SubscriptionTable>,
    pub(crate) command_tx: mpsc::Sender<BusCommand>,
    pub(crate) command_rx: tokio::sync::Mutex<mpsc::Receiver<BusCommand>>,
}

impl BusShared {
    pub(crate) fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for the collaboration bus.
///
/// Subscriptions survive reconnects: every topic that still has a live
/// handler is re-joined when the connection comes back. Messages missed while
/// disconnected are not replayed.
pub struct BusClient {
    config: BusConfig,
    shared: Arc<BusShared>,
    running: Mutex<Option<Running>>,
}

impl BusClient {
    pub fn new(config: BusConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (connected, _) = watch::channel(false);
        Self {
            config,
            shared: Arc::new(BusShared {
                connected,
                subscriptions: Mutex::new(SubscriptionTable::default()),
                command_tx,
                command_rx: tokio::sync::Mutex::new(command_rx),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Start the background connection. Calling it while already running
    /// does nothing. Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(current) = running.as_ref() {
            if !current.task.is_finished() {
                return;
            }
        }

        info!(url = %self.config.redacted_url(), "Starting collaboration bus");
        let cancel = CancellationToken::new();
        let task = tokio::spawn(connection_loop(
            self.config.clone(),
            Arc::clone(&self.shared),
            cancel.clone(),
        ));
        *running = Some(Running { cancel, task });
    }

    /// Stop the connection and wait for it to close. Safe to call when not
    /// connected, and safe to call repeatedly.
    pub async fn disconnect(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            warn!(error = %e, "Collaboration bus task ended abnormally");
        }
        self.shared.connected.send_replace(false);
        info!("Collaboration bus disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Watch connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<bool> {
        self.shared.connected.subscribe()
    }

    /// Register `handler` for every message arriving on `topic`.
    ///
    /// Handlers run on the connection task and should return quickly.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&BusMessage) + Send + Sync + 'static,
    {
        let id = new_id();
        let active = Arc::new(AtomicBool::new(true));
        let first = lock_table(&self.shared.subscriptions).insert(
            topic,
            &id,
            Entry {
                handler: Arc::new(handler),
                active: Arc::clone(&active),
            },
        );
        debug!(topic, id = %id, "Subscribed");

        if first && self.is_connected() {
            let _ = self.shared.command_tx.try_send(BusCommand::Join {
                topic: topic.to_string(),
            });
        }

        Subscription::new(id, topic.to_string(), active, Arc::downgrade(&self.shared))
    }

    /// Fire-and-forget broadcast on `topic`.
    pub fn publish(&self, topic: &str, event: &str, payload: serde_json::Value) -> PublishStatus {
        if !self.is_connected() {
            debug!(topic, event, "Publish suppressed: not connected");
            return PublishStatus::Suppressed;
        }
        match self.shared.command_tx.try_send(BusCommand::Broadcast {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
        }) {
            Ok(()) => PublishStatus::Sent,
            Err(e) => {
                warn!(topic, event, error = %e, "Publish dropped");
                PublishStatus::Suppressed
            }
        }
    }
}

impl EventPublisher for BusClient {
    fn publish(&self, topic: &str, event: &str, payload: serde_json::Value) -> PublishStatus {
        BusClient::publish(self, topic, event, payload)
    }
}

impl Drop for BusClient {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(running) = running {
            running.cancel.cancel();
        }
    }
}
