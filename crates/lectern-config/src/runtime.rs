//! Conversions from the file schema into the runtime settings each
//! `lectern-room` component takes.

use std::path::PathBuf;
use std::time::Duration;

use lectern_room::{
    BusConfig, OwnerStore, PaneBinding, SessionConfig, SessionError, TokenClientConfig,
};

use crate::schema::LecternConfig;

impl LecternConfig {
    pub fn token_client_config(&self) -> TokenClientConfig {
        TokenClientConfig {
            base_url: self.server.application_server_url.clone(),
            endpoint: self.server.token_endpoint,
            timeout_secs: u64::from(self.server.request_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.server.request_timeout_secs))
    }

    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            url: self.bus.url.clone(),
            heartbeat_interval_secs: u64::from(self.bus.heartbeat_interval),
            reconnect_delay_secs: u64::from(self.bus.reconnect_delay),
            max_reconnect_delay_secs: u64::from(self.bus.max_reconnect_delay),
            connect_timeout_secs: u64::from(self.bus.connect_timeout),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            media_url: self.media.url.clone(),
        }
    }

    pub fn pane_binding(&self) -> PaneBinding {
        PaneBinding::new(self.whiteboard.owner_pane)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.directory.poll_interval_secs))
    }

    /// Resolved owner store location, or `None` when records stay in memory.
    pub fn owner_store_path(&self) -> Option<PathBuf> {
        if self.storage.in_memory {
            return None;
        }
        self.storage
            .owner_store_path
            .clone()
            .or_else(OwnerStore::default_path)
    }

    /// Open the owner store this config points at.
    pub fn owner_store(&self) -> Result<OwnerStore, SessionError> {
        match self.owner_store_path() {
            Some(path) => OwnerStore::open(path),
            None => Ok(OwnerStore::in_memory()),
        }
    }
}
