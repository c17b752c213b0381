//! Incoming Phoenix message handling and dispatch to subscribers.

use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};

use super::client::BusShared;
use super::subscription::lock_table;
use super::types::{phx, BusMessage, PhoenixMessage};

/// Handle a single incoming Phoenix message.
pub(crate) fn handle_phoenix_message(msg: &PhoenixMessage, shared: &BusShared) {
    let topic = msg.topic.as_str();

    match msg.event.as_str() {
        phx::REPLY => {
            match msg.payload.get("status").and_then(|s| s.as_str()) {
                Some("ok") => debug!(topic = %topic, "Channel reply: ok"),
                Some(status) => {
                    let reason = msg
                        .payload
                        .get("response")
                        .and_then(|r| r.get("reason"))
                        .and_then(|r| r.as_str())
                        .unwrap_or("unknown error");
                    warn!(topic = %topic, status = %status, reason = %reason, "Channel reply error");
                }
                None => {}
            }
        }
        phx::ERROR => warn!(topic = %topic, "Channel error"),
        phx::CLOSE => info!(topic = %topic, "Channel closed"),
        phx::BROADCAST => {
            // Extract the inner event name and payload.
            let event = msg
                .payload
                .get("event")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown")
                .to_string();
            let payload = msg
                .payload
                .get("payload")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            debug!(topic = %topic, event = %event, "Broadcast received");
            dispatch(
                shared,
                &BusMessage {
                    topic: topic.to_string(),
                    event,
                    payload,
                },
            );
        }
        _ => {
            debug!(topic = %topic, event = %msg.event, "Unhandled Phoenix event");
        }
    }
}

/// Invoke every live handler for the message's topic, outside the table lock.
pub(crate) fn dispatch(shared: &BusShared, message: &BusMessage) {
    let entries = lock_table(&shared.subscriptions).entries(&message.topic);
    for entry in entries {
        if entry.active.load(Ordering::SeqCst) {
            (entry.handler)(message);
        }
    }
}
