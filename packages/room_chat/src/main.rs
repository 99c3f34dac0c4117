use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use room_sync::{
    ChatEndpoints, Command, HttpHistory, InputAction, Room, RoomSession, StateFileLocation,
    ViewChange, WsConnector,
};

mod config;
mod terminal;

use crate::config::{ChatConfig, FileConfig, load_config};
use crate::terminal::{LineCommand, parse_line, render_change, render_rooms};

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Terminal client for room-based chat")]
struct Cli {
    /// Custom data directory (defaults to ~/.room-chat)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Room to join on start, instead of the last visited one
    #[arg(long)]
    room: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is the transcript.
    let default_directive = if cli.debug {
        "room_chat=debug,room_sync=debug,info"
    } else {
        "room_chat=info,room_sync=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let config = ChatConfig::new(cli.data_dir.clone())?;
    let file_config: FileConfig = load_config(&config.data_dir)
        .extract()
        .with_context(|| {
            format!(
                "Failed to load configuration from {}",
                config.config_toml_path().display()
            )
        })?;

    let endpoints = ChatEndpoints::new(&file_config.server.base_url)?;
    let directory = file_config.directory();
    if directory.is_empty() {
        anyhow::bail!(
            "No rooms configured; set [chat] rooms in {}",
            config.config_toml_path().display()
        );
    }

    info!(server = %endpoints.base(), rooms = directory.len(), "Starting chat client");

    let (view_tx, mut view_rx) = mpsc::unbounded_channel();
    let mut session = RoomSession::new(
        directory.clone(),
        HttpHistory::new(endpoints.clone()),
        WsConnector::new(endpoints.clone()),
        &file_config.sync_config(),
    )
    .with_identity(file_config.chat.username.as_deref())
    .with_location(StateFileLocation::new(config.location_path()))
    .with_observer(view_tx);
    session.start(cli.room.as_deref());

    let (commands, commands_rx) = mpsc::channel::<Command>(64);
    let session_task = tokio::spawn(session.run(commands_rx));

    let mut lines = spawn_stdin_reader();
    let mut active: Option<Room> = None;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                let sent = match parse_line(&line) {
                    LineCommand::Join(room) => commands.send(Command::SwitchRoom(room)).await.is_ok(),
                    LineCommand::Rooms => {
                        println!("{}", render_rooms(&directory, active.as_ref()));
                        true
                    }
                    LineCommand::Quit => break,
                    LineCommand::Say(text) => {
                        commands.send(Command::Input(InputAction::SetText(text))).await.is_ok()
                            && commands.send(Command::Input(InputAction::SendClicked)).await.is_ok()
                    }
                    LineCommand::Usage(usage) => {
                        println!("{usage}");
                        true
                    }
                };
                if !sent {
                    warn!("Session ended unexpectedly");
                    break;
                }
            }
            change = view_rx.recv() => {
                let Some(change) = change else { break };
                if let ViewChange::Cleared { room } = &change {
                    active = Some(room.clone());
                }
                println!("{}", render_change(&change, &endpoints));
            }
        }
    }

    let _ = commands.send(Command::Shutdown).await;
    session_task.await.context("Session task panicked")?;
    info!("Bye");
    Ok(())
}

/// Reads stdin on a plain thread; lines are forwarded until stdin closes or
/// the receiver goes away.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
