//! Room session lifecycle.
//!
//! A session holds at most one room membership. `create` and `join` run a
//! claim → tokens → connect sequence that fully rolls back on failure;
//! `leave` may be called at any point, including while an attempt is still
//! in flight, in which case the attempt's late results are discarded.

mod room_session;
mod types;


pub use room_session::RoomSession;
pub use types::{Room, RoomHandle, RoomState, SessionConfig};
