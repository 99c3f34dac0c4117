//! Core data model: rooms, messages, timestamps and the session epoch.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Author shown when a message carries no (or a blank) author.
pub const ANONYMOUS: &str = "Anonymous";

/// Format the chat server stamps messages with.
const SERVER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used when showing a parsed timestamp to the user.
const DISPLAY_TIMESTAMP_FORMAT: &str = "%b %-d, %Y %H:%M";

/// A named channel scoping both history and live messages.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Room(String);

impl Room {
    /// Returns `None` for names that are empty after trimming.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The externally supplied, read-only set of rooms, in display order.
#[derive(Clone, Debug, Default)]
pub struct RoomDirectory {
    rooms: Vec<Room>,
}

impl RoomDirectory {
    /// Blank names are skipped and duplicates keep their first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rooms: Vec<Room> = Vec::new();
        for room in names.into_iter().filter_map(Room::new) {
            if !rooms.contains(&room) {
                rooms.push(room);
            }
        }
        Self { rooms }
    }

    pub fn get(&self, name: &str) -> Option<&Room> {
        let name = name.trim();
        self.rooms.iter().find(|r| r.name() == name)
    }

    pub fn contains(&self, room: &Room) -> bool {
        self.rooms.contains(room)
    }

    pub fn first(&self) -> Option<&Room> {
        self.rooms.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Opaque, orderable server-assigned timestamp.
///
/// Kept exactly as the server sent it; [`Timestamp::display`] only
/// reformats values it recognises.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses the server format first, then RFC 3339.
    pub fn parsed(&self) -> Option<NaiveDateTime> {
        let raw = self.0.trim();
        NaiveDateTime::parse_from_str(raw, SERVER_TIMESTAMP_FORMAT)
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    /// Human-readable form; unrecognised values are shown verbatim.
    pub fn display(&self) -> String {
        match self.parsed() {
            Some(dt) => dt.format(DISPLAY_TIMESTAMP_FORMAT).to_string(),
            None => self.0.clone(),
        }
    }
}

/// A chat message as confirmed by the server (or composed for sending).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub author: String,
    pub text: String,
    pub timestamp: Timestamp,
}

impl Message {
    pub fn new(author: Option<&str>, text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            author: normalize_author(author),
            text: text.into(),
            timestamp,
        }
    }
}

/// Falls back to [`ANONYMOUS`] for missing or blank authors.
pub fn normalize_author(author: Option<&str>) -> String {
    match author.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS.to_string(),
    }
}

/// One room-switch epoch. Strictly increasing for the life of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// The active room and the generation that owns it.
///
/// Only [`crate::RoomSession`] advances it; everything else reads it to
/// decide whether an asynchronous result is still current.
#[derive(Debug, Default)]
pub struct Session {
    active_room: Option<Room>,
    generation: Generation,
}

impl Session {
    pub fn active_room(&self) -> Option<&Room> {
        self.active_room.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub(crate) fn advance(&mut self, room: Room) -> Generation {
        self.generation = self.generation.next();
        self.active_room = Some(room);
        self.generation
    }
}
