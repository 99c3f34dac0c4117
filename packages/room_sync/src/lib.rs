//! Room Sync - client-side core of a room-based chat
//!
//! Keeps exactly one room active, replays its recent history, streams live
//! messages for it, and sends the user's messages into it. Switching rooms
//! retires everything that belonged to the previous room; late results from
//! it are recognised by their generation and dropped.
//!
//! The crate has no UI. Frontends observe [`ViewChange`]s and feed
//! [`Command`]s in.
//!
//! # Example
//!
//! ```no_run
//! use room_sync::{
//!     ChatEndpoints, Command, HttpHistory, InputAction, RoomDirectory, RoomSession, SyncConfig,
//!     WsConnector,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let endpoints = ChatEndpoints::new("http://localhost:8000").unwrap();
//!     let rooms = RoomDirectory::new(["general", "random"]);
//!
//!     let (view_tx, mut view_rx) = mpsc::unbounded_channel();
//!     let mut session = RoomSession::new(
//!         rooms,
//!         HttpHistory::new(endpoints.clone()),
//!         WsConnector::new(endpoints),
//!         &SyncConfig::default(),
//!     )
//!     .with_identity(Some("alice"))
//!     .with_observer(view_tx);
//!     session.start(None);
//!
//!     let (commands, rx) = mpsc::channel(16);
//!     tokio::spawn(session.run(rx));
//!
//!     commands
//!         .send(Command::Input(InputAction::SetText("hello".into())))
//!         .await
//!         .unwrap();
//!     commands.send(Command::Input(InputAction::SendClicked)).await.unwrap();
//!
//!     while let Some(change) = view_rx.recv().await {
//!         println!("{change:?}");
//!     }
//! }
//! ```

pub mod compose;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod history;
pub mod location;
pub mod model;
pub mod render;
pub mod session;
pub mod transport;
pub mod wire;

pub use compose::{InputAction, InputField, Key, OutboundComposer};
pub use config::{ReconnectPolicy, SyncConfig};
pub use endpoints::ChatEndpoints;
pub use error::{DecodeError, EndpointError, HistoryFetchError, TransportError, ValidationError};
pub use history::{HistoryBatch, HistoryLoader, HistorySource, HttpHistory};
pub use location::{Location, MemoryLocation, StateFileLocation};
pub use model::{ANONYMOUS, Generation, Message, Room, RoomDirectory, Session, Timestamp};
pub use render::{MessageRenderer, View, ViewChange, ViewEntry, sanitize_for_terminal};
pub use session::{Command, RoomSession, SessionEvent};
pub use transport::{
    ConnectionEvent, ConnectionId, ConnectionState, Connector, FrameSink, FrameStream, Link,
    TransportManager, WsConnector,
};
