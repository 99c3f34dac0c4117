//! Line-oriented terminal front end: stdin lines in, transcript lines out.

use room_sync::{ChatEndpoints, Room, RoomDirectory, ViewChange, sanitize_for_terminal};

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum LineCommand {
    Join(String),
    Rooms,
    Quit,
    /// Anything else is message text.
    Say(String),
    Usage(&'static str),
}

pub fn parse_line(line: &str) -> LineCommand {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(command) = line.strip_prefix('/') else {
        return LineCommand::Say(line.to_string());
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "join" if arg.is_empty() => LineCommand::Usage("usage: /join <room>"),
        "join" => LineCommand::Join(arg.to_string()),
        "rooms" => LineCommand::Rooms,
        "quit" | "exit" => LineCommand::Quit,
        _ => LineCommand::Say(line.to_string()),
    }
}

/// One transcript line per view change.
pub fn render_change(change: &ViewChange, endpoints: &ChatEndpoints) -> String {
    match change {
        ViewChange::Cleared { room } => format!(
            "── {} ── {}",
            sanitize_for_terminal(&room.to_string()),
            endpoints.deep_link(room)
        ),
        ViewChange::Appended(entry) => entry.terminal_line(),
    }
}

/// The directory, one room per line, the active room starred.
pub fn render_rooms(directory: &RoomDirectory, active: Option<&Room>) -> String {
    directory
        .iter()
        .map(|room| {
            let marker = if Some(room) == active { '*' } else { ' ' };
            format!("{marker} {}", sanitize_for_terminal(room.name()))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
