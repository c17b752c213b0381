//! Subcommand implementations.

mod board;

use lectern_common::{LecternError, Result};
use lectern_config::LecternConfig;
use lectern_room::{
    OwnerStore, Participant, RoomDirectory, RoomEntry, ScopedIdentity, SessionError, TokenClient,
    TokenIntent, TokenProvider,
};

use tokio_util::sync::CancellationToken;

use crate::cli::Command;

pub async fn run(command: Command, config: &LecternConfig) -> Result<()> {
    match command {
        Command::Rooms { watch: false } => list_rooms(config).await,
        Command::Rooms { watch: true } => watch_rooms(config).await,
        Command::Token {
            room,
            name,
            purpose,
            join,
        } => {
            let intent = if join {
                TokenIntent::Join
            } else {
                TokenIntent::Create
            };
            let client = TokenClient::new(config.token_client_config());
            let token = client
                .request_token(intent, &room, &ScopedIdentity::new(purpose, name))
                .await
                .map_err(session_error)?;
            println!("{token}");
            Ok(())
        }
        Command::Watch { target } => board::watch(config, &target).await,
        Command::Draw {
            target,
            pane,
            elements,
        } => board::draw(config, &target, pane, &elements).await,
    }
}

fn directory(config: &LecternConfig) -> RoomDirectory {
    RoomDirectory::new(
        config.server.application_server_url.clone(),
        config.request_timeout(),
    )
}

fn print_rooms(rooms: &[RoomEntry]) {
    if rooms.is_empty() {
        println!("No active rooms");
        return;
    }
    for room in rooms {
        println!("{}\t{}", room.name, room.owner_identity);
    }
}

async fn list_rooms(config: &LecternConfig) -> Result<()> {
    let rooms = directory(config).refresh().await.map_err(session_error)?;
    print_rooms(&rooms);
    Ok(())
}

async fn watch_rooms(config: &LecternConfig) -> Result<()> {
    let directory = directory(config);
    let interval = config.poll_interval();
    let cancel = CancellationToken::new();
    let poller = directory.spawn_polling(interval, cancel.clone());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(interval);
    let mut last: Option<Vec<RoomEntry>> = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                let rooms = directory.rooms().await;
                if last.as_ref() != Some(&rooms) {
                    print_rooms(&rooms);
                    last = Some(rooms);
                }
            }
        }
    }

    cancel.cancel();
    if let Err(e) = poller.await {
        tracing::warn!(error = %e, "Room polling task ended abnormally");
    }
    Ok(())
}

/// Work out who `name` is in `room`.
///
/// The owner comes from, in order: the explicit override, the room
/// directory, the local owner store.
pub(crate) async fn resolve_participant(
    directory: &RoomDirectory,
    owners: &OwnerStore,
    room: &str,
    name: &str,
    owner_override: Option<&str>,
) -> Result<Participant> {
    let owner = match owner_override {
        Some(owner) => Some(owner.to_string()),
        None => {
            if let Err(e) = directory.refresh().await {
                tracing::warn!(room, error = %e, "Room directory unavailable");
            }
            match directory.owner_of(room).await {
                Some(owner) => Some(owner),
                None => owners.owner(room).await,
            }
        }
    };

    let owner = owner.ok_or_else(|| {
        LecternError::Session(format!("no known owner for room {room}; pass --owner"))
    })?;
    let participant = Participant::resolve(name, &owner);
    tracing::info!(room, identity = name, role = %participant.role, "Resolved role");
    Ok(participant)
}

pub(crate) fn session_error(e: SessionError) -> LecternError {
    LecternError::Session(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_room::Role;
    use std::time::Duration;

    // Nothing listens on port 9; the directory refresh fails fast.
    fn offline_directory() -> RoomDirectory {
        RoomDirectory::new("http://127.0.0.1:9/", Duration::from_millis(200))
    }

    #[tokio::test]
    async fn override_wins() {
        let owners = OwnerStore::in_memory();
        owners.claim("standup", "carol").await.unwrap();

        let participant =
            resolve_participant(&offline_directory(), &owners, "standup", "alice", Some("alice"))
                .await
                .unwrap();
        assert_eq!(participant.role, Role::Owner);
    }

    #[tokio::test]
    async fn falls_back_to_owner_store() {
        let owners = OwnerStore::in_memory();
        owners.claim("standup", "alice").await.unwrap();

        let participant =
            resolve_participant(&offline_directory(), &owners, "standup", "bob", None)
                .await
                .unwrap();
        assert_eq!(participant.role, Role::Attendee);
    }

    #[tokio::test]
    async fn unknown_owner_is_an_error() {
        let owners = OwnerStore::in_memory();
        let err = resolve_participant(&offline_directory(), &owners, "standup", "bob", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LecternError::Session(_)));
        assert!(err.to_string().contains("--owner"));
    }
}
