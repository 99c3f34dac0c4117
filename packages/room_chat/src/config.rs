use anyhow::{Context, Result};
use room_sync::{ReconnectPolicy, RoomDirectory, SyncConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [server]
//                    base_url = "https://chat.example.com"
//
//   env var:         CHAT_SERVER__BASE_URL=https://chat.example.com
//
//   (single underscore stays within field names: CHAT_TIMEOUTS__HISTORY_SECS)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub chat: ChatFileConfig,
    #[serde(default)]
    pub timeouts: TimeoutsFileConfig,
    #[serde(default)]
    pub reconnect: ReconnectFileConfig,
}

/// Where the chat server lives (`[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Rooms and identity (`[chat]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatFileConfig {
    #[serde(default = "default_rooms")]
    pub rooms: Vec<String>,
    /// Absent means messages are sent anonymously.
    #[serde(default)]
    pub username: Option<String>,
}

impl Default for ChatFileConfig {
    fn default() -> Self {
        Self {
            rooms: default_rooms(),
            username: None,
        }
    }
}

/// Upper bounds on history requests and handshakes (`[timeouts]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeoutsFileConfig {
    #[serde(default = "default_timeout_secs")]
    pub history_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub handshake_secs: u64,
}

impl Default for TimeoutsFileConfig {
    fn default() -> Self {
        Self {
            history_secs: default_timeout_secs(),
            handshake_secs: default_timeout_secs(),
        }
    }
}

/// Backoff for reopening a dropped connection (`[reconnect]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconnectFileConfig {
    /// 0 disables reconnecting.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectFileConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_rooms() -> Vec<String> {
    vec!["general".to_string()]
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8000
}

/// Build a figment that layers: defaults → config.toml → CHAT_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `CHAT_SERVER__BASE_URL=https://chat.example.com`  →  `server.base_url`
///   `CHAT_RECONNECT__MAX_ATTEMPTS=0`  →  `reconnect.max_attempts = 0`
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("CHAT_").split("__"))
}

impl FileConfig {
    pub fn directory(&self) -> RoomDirectory {
        RoomDirectory::new(self.chat.rooms.iter().map(String::as_str))
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            history_timeout: Duration::from_secs(self.timeouts.history_secs),
            handshake_timeout: Duration::from_secs(self.timeouts.handshake_secs),
            reconnect: ReconnectPolicy {
                max_attempts: self.reconnect.max_attempts,
                base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            },
        }
    }
}

// =============================================================================
// Directory layout config (not tunable via figment; derived from --data-dir)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub data_dir: PathBuf,
}

impl ChatConfig {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".room-chat"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        let state_dir = data_dir.join("state");
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create state directory: {:?}", state_dir))?;

        info!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    /// Persisted deep link: the last active room.
    pub fn location_path(&self) -> PathBuf {
        self.state_dir().join("room")
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}
