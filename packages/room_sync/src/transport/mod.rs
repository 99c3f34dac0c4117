//! The single live connection and its lifecycle.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | Per-connection driver task: handshake, read/write loop, close |
//! | `websocket` | [`Connector`] over `tokio-tungstenite` |
//!
//! [`TransportManager`] owns at most one [`Connection`] at a time. Each
//! connection reports to the manager over its own channel; replacing a
//! connection drops that channel, so nothing a retired connection does can
//! reach the session.

mod connection;
mod websocket;

pub use websocket::WsConnector;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::Sink;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::model::{Generation, Room};

/// Outbound half of an established link: text frames to the server.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of an established link: text frames from the server.
/// The stream ends when the server closes the connection.
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// An established bidirectional link to a room's live stream.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Establishes links to a room's live stream.
pub trait Connector: Clone + Send + Sync + 'static {
    /// Resolves once the handshake has completed.
    fn connect(&self, room: &Room) -> impl Future<Output = Result<Link, TransportError>> + Send;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Connecting or Open.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// What a connection reports back while it lives.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Handshake succeeded.
    Opened,
    /// A text frame from the server, not yet decoded.
    Frame(String),
    /// The connection ended on its own. `None` means the server closed it
    /// cleanly; an error means the handshake or the link failed.
    Closed(Option<TransportError>),
}

/// Monotonic id for log correlation.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    id: ConnectionId,
    room: Room,
    owning_generation: Generation,
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<String>>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    task: JoinHandle<()>,
}

impl Connection {
    fn observe(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => self.state = ConnectionState::Open,
            ConnectionEvent::Frame(_) => {}
            ConnectionEvent::Closed(_) => {
                self.state = ConnectionState::Closed;
                self.outbound = None;
            }
        }
    }

    /// Best-effort teardown. A handshake in progress is cancelled outright;
    /// an open link is asked to close by dropping its outbound channel.
    /// Returns the driver task, which finishes once the link is gone.
    fn retire(mut self) -> JoinHandle<()> {
        let previous = self.state;
        self.state = ConnectionState::Closing;
        match previous {
            ConnectionState::Connecting => self.task.abort(),
            ConnectionState::Open => self.outbound = None,
            _ => {}
        }
        debug!(
            id = %self.id,
            room = %self.room,
            generation = %self.owning_generation,
            from = ?previous,
            "connection retired"
        );
        self.task
    }
}

/// Owns the one live connection.
pub struct TransportManager<C> {
    connector: C,
    handshake_timeout: Duration,
    current: Option<Connection>,
    /// Driver of the last connection closed through [`close`](Self::close).
    retiring: Option<JoinHandle<()>>,
    next_id: u64,
}

impl<C: Connector> TransportManager<C> {
    pub fn new(connector: C, handshake_timeout: Duration) -> Self {
        Self {
            connector,
            handshake_timeout,
            current: None,
            retiring: None,
            next_id: 1,
        }
    }

    /// Opens a connection to `room` owned by `generation`, closing any
    /// existing one first.
    pub fn open(&mut self, room: &Room, generation: Generation) {
        self.close();

        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(connection::drive(
            self.connector.clone(),
            id,
            room.clone(),
            self.handshake_timeout,
            events_tx,
            outbound_rx,
        ));

        info!(%id, %room, %generation, "opening connection");
        self.current = Some(Connection {
            id,
            room: room.clone(),
            owning_generation: generation,
            state: ConnectionState::Connecting,
            outbound: Some(outbound_tx),
            events: events_rx,
            task,
        });
    }

    /// Closes the current connection, if any. Never fails.
    pub fn close(&mut self) {
        if let Some(conn) = self.current.take() {
            self.retiring = Some(conn.retire());
        }
    }

    /// State of the current connection. After [`close`](Self::close) this is
    /// `Closing` until the retired driver has finished, then `Closed`. `Idle`
    /// only before the first connection.
    pub fn state(&self) -> ConnectionState {
        match (&self.current, &self.retiring) {
            (Some(conn), _) => conn.state,
            (None, Some(task)) if task.is_finished() => ConnectionState::Closed,
            (None, Some(_)) => ConnectionState::Closing,
            (None, None) => ConnectionState::Idle,
        }
    }

    pub fn owning_generation(&self) -> Option<Generation> {
        self.current.as_ref().map(|c| c.owning_generation)
    }

    pub fn room(&self) -> Option<&Room> {
        self.current.as_ref().map(|c| &c.room)
    }

    /// Number of connections this manager holds in Connecting or Open.
    pub fn active_count(&self) -> usize {
        usize::from(self.state().is_active())
    }

    pub fn is_open_for(&self, generation: Generation) -> bool {
        self.current.as_ref().is_some_and(|c| {
            c.state == ConnectionState::Open && c.owning_generation == generation
        })
    }

    /// Queues `payload` on the open connection owned by `generation`.
    /// Returns false, and does nothing, in every other case.
    pub fn send(&mut self, generation: Generation, payload: String) -> bool {
        if !self.is_open_for(generation) {
            return false;
        }
        self.current
            .as_ref()
            .and_then(|c| c.outbound.as_ref())
            .is_some_and(|tx| tx.send(payload).is_ok())
    }

    /// Waits for the current connection's next event. Never resolves while
    /// there is no connection or after it has ended.
    pub async fn next_event(&mut self) -> (Generation, ConnectionEvent) {
        let Some(conn) = self.current.as_mut() else {
            return std::future::pending().await;
        };
        match conn.events.recv().await {
            Some(event) => {
                conn.observe(&event);
                (conn.owning_generation, event)
            }
            None => {
                // Driver exited without reporting; treat as closed.
                conn.state = ConnectionState::Closed;
                conn.outbound = None;
                std::future::pending().await
            }
        }
    }
}

impl<C> Drop for TransportManager<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.current.take() {
            let _ = conn.retire();
        }
    }
}
