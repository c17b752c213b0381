//! Collaboration bus client over the Phoenix Channels v1 protocol.
//!
//! One long-lived WebSocket per process, shared by every room feature that
//! needs fan-out messaging. Handles heartbeats, topic join/leave, broadcast,
//! and auto-reconnect with backoff. Subscriptions are explicit handles.

mod client;
mod connection;
mod handler;
mod subscription;
mod types;

#[cfg(test)]
mod tests;

pub use client::{BusClient, EventPublisher};
pub use subscription::Subscription;
pub use types::{BusConfig, BusMessage, PhoenixMessage, PublishStatus};
