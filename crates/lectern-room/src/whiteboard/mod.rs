//! Whiteboard coordinator.
//!
//! Two panes per room. The owner draws on one, attendees on the other, and
//! every participant renders both. Each accepted local edit broadcasts a
//! full snapshot of the pane; a received snapshot replaces the local copy of
//! the pane the receiver does not own.

mod coordinator;
mod types;


pub use coordinator::WhiteboardCoordinator;
pub use types::{BoardChange, ChangeOrigin, PaneBinding, RemoteOutcome, WhiteboardError};
