use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lectern_room::{BoardId, Purpose};

/// Lectern: room directory, access tokens, and whiteboard sync from the terminal.
#[derive(Parser, Debug)]
#[command(name = "lectern", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List active rooms and their owners.
    Rooms {
        /// Keep polling and print the list whenever it changes.
        #[arg(long)]
        watch: bool,
    },

    /// Mint a single access token and print it.
    Token {
        #[arg(long)]
        room: String,
        /// Participant identity.
        #[arg(long)]
        name: String,
        /// rtc, chat, or whiteboard.
        #[arg(long, default_value = "rtc")]
        purpose: Purpose,
        /// Request an attendee token instead of a creator token.
        #[arg(long)]
        join: bool,
    },

    /// Follow a room's whiteboard and log pane updates until Ctrl-C.
    Watch {
        #[command(flatten)]
        target: BoardTarget,
    },

    /// Replace one pane of a room's whiteboard with the elements in a JSON file.
    Draw {
        #[command(flatten)]
        target: BoardTarget,
        /// left or right.
        #[arg(long)]
        pane: BoardId,
        /// File holding a JSON array of drawing elements.
        #[arg(long)]
        elements: PathBuf,
    },
}

/// Room and identity for whiteboard commands.
#[derive(clap::Args, Debug, Clone)]
pub struct BoardTarget {
    #[arg(long)]
    pub room: String,
    /// Participant identity.
    #[arg(long)]
    pub name: String,
    /// Owner identity, when neither the directory nor the owner store knows it.
    #[arg(long)]
    pub owner: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
