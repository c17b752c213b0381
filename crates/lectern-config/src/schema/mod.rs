//! Configuration schema types for Lectern.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod collab;
mod server;
mod system;

pub use collab::*;
pub use server::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Lectern.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LecternConfig {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub bus: BusSettings,
    pub whiteboard: WhiteboardConfig,
    pub directory: DirectoryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}
