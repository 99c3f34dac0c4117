//! Where the active room is remembered between runs (the deep link).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::model::Room;

/// The addressable location the active room is reflected into.
pub trait Location: Send {
    /// Room name to open on start-up, if one was recorded.
    fn read(&self) -> Option<String>;

    /// Records `room` as the current location. Failures are logged only.
    fn write(&mut self, room: &Room);
}

/// In-process location. Clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryLocation {
    room: Arc<Mutex<Option<String>>>,
}

impl MemoryLocation {
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            room: Arc::new(Mutex::new(initial.map(str::to_string))),
        }
    }
}

impl Location for MemoryLocation {
    fn read(&self) -> Option<String> {
        self.room.lock().ok().and_then(|slot| slot.clone())
    }

    fn write(&mut self, room: &Room) {
        if let Ok(mut slot) = self.room.lock() {
            *slot = Some(room.name().to_string());
        }
    }
}

/// Keeps the room name in a small state file.
#[derive(Clone, Debug)]
pub struct StateFileLocation {
    path: PathBuf,
}

impl StateFileLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Location for StateFileLocation {
    fn read(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let name = raw.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    fn write(&mut self, room: &Room) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "cannot create state directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, room.name()) {
            warn!(path = %self.path.display(), error = %e, "cannot record room");
        }
    }
}
