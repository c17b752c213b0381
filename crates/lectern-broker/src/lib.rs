//! lectern-broker: development message broker for the collaboration bus.
//!
//! Speaks the Phoenix channel v1 envelope. Clients join topics; a broadcast
//! on a topic is forwarded verbatim to every other member of that topic.
//! Nothing is persisted or replayed.

mod connection;
pub mod protocol;
mod topics;


use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_util::sync::CancellationToken;

pub use connection::handle_connection;
pub use topics::{ConnId, TopicStore};

/// Accept connections on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, store: TopicStore, shutdown: CancellationToken) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, addr)) => {
                let store = store.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, store, shutdown).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
    tracing::info!("Broker stopped accepting connections");
}

/// A broker running on a background task.
pub struct Broker {
    addr: SocketAddr,
    store: TopicStore,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Broker {
    /// Bind `addr` (use port 0 for an ephemeral port) and start serving.
    pub async fn start(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let store = TopicStore::new();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(serve(listener, store.clone(), shutdown.clone()));
        tracing::info!(%addr, "lectern-broker listening");
        Ok(Self {
            addr,
            store,
            shutdown,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/socket/websocket", self.addr)
    }

    pub fn store(&self) -> &TopicStore {
        &self.store
    }

    /// Stop accepting, close every open connection, and wait for the
    /// accept loop to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.task.await;
    }
}
