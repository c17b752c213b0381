//! `watch` and `draw`: whiteboard sync over the collaboration bus.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lectern_common::{LecternError, Result};
use lectern_config::LecternConfig;
use lectern_room::{
    BoardId, BusClient, ChangeOrigin, DrawingElement, EventPublisher, PublishStatus,
    WhiteboardCoordinator,
};
use tokio::sync::broadcast::error::RecvError;

use super::{resolve_participant, session_error};
use crate::cli::BoardTarget;

/// Bus client plus a coordinator attached to it.
struct Board {
    bus: Arc<BusClient>,
    coordinator: Arc<WhiteboardCoordinator>,
}

impl Board {
    async fn open(config: &LecternConfig, target: &BoardTarget) -> Result<Self> {
        let directory = super::directory(config);
        let owners = config.owner_store().map_err(session_error)?;
        let participant = resolve_participant(
            &directory,
            &owners,
            &target.room,
            &target.name,
            target.owner.as_deref(),
        )
        .await?;

        let bus = Arc::new(BusClient::new(config.bus_config()));
        let publisher: Arc<dyn EventPublisher> = bus.clone();
        let coordinator = Arc::new(WhiteboardCoordinator::new(
            target.room.clone(),
            participant,
            config.pane_binding(),
            publisher,
        ));
        coordinator.attach(&bus);
        bus.connect();

        Ok(Self { bus, coordinator })
    }

    async fn wait_connected(&self) -> Result<()> {
        let timeout = Duration::from_secs(self.bus.config().connect_timeout_secs);
        let mut state = self.bus.connection_state();
        let outcome = tokio::time::timeout(timeout, state.wait_for(|connected| *connected))
            .await
            .map(|waited| waited.map(|_| ()));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(LecternError::Network("bus connection closed".into())),
            Err(_) => Err(LecternError::Network(format!(
                "bus not connected after {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn close(self) {
        self.coordinator.detach();
        self.bus.disconnect().await;
    }
}

pub(super) async fn watch(config: &LecternConfig, target: &BoardTarget) -> Result<()> {
    let board = Board::open(config, target).await?;
    let mut changes = board.coordinator.subscribe_changes();
    tracing::info!(
        room = %target.room,
        pane = %board.coordinator.owned_pane(),
        "Watching whiteboard (Ctrl-C to stop)"
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            change = changes.recv() => match change {
                Ok(change) if change.origin == ChangeOrigin::Remote => {
                    tracing::info!(
                        pane = %change.pane,
                        sender = %change.sender,
                        elements = change.elements.len(),
                        "Pane updated"
                    );
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped pane updates");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    board.close().await;
    Ok(())
}

pub(super) async fn draw(
    config: &LecternConfig,
    target: &BoardTarget,
    pane: BoardId,
    elements_path: &Path,
) -> Result<()> {
    let elements = read_elements(elements_path)?;
    let board = Board::open(config, target).await?;

    let result = match board.wait_connected().await {
        Ok(()) => board
            .coordinator
            .local_edit(pane, elements)
            .map_err(|e| LecternError::Whiteboard(e.to_string())),
        Err(e) => Err(e),
    };
    board.close().await;

    match result? {
        PublishStatus::Sent => {
            tracing::info!(room = %target.room, %pane, "Published pane");
            Ok(())
        }
        PublishStatus::Suppressed => Err(LecternError::Network(
            "bus disconnected before the update was sent".into(),
        )),
    }
}

/// Read a JSON array of drawing elements.
pub(crate) fn read_elements(path: &Path) -> Result<Vec<DrawingElement>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    match value {
        serde_json::Value::Array(elements) => Ok(elements),
        _ => Err(LecternError::Other(format!(
            "{} must contain a JSON array of elements",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_element_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(&path, r#"[{"id":"e1","type":"rectangle"},{"id":"e2"}]"#).unwrap();

        let elements = read_elements(&path).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0]["id"], "e1");
    }

    #[test]
    fn rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(&path, r#"{"id":"e1"}"#).unwrap();

        assert!(matches!(read_elements(&path), Err(LecternError::Other(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_elements(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LecternError::Io(_)));
    }
}
