//! Scripted history and transport doubles. The test plays the server: it
//! receives each request or link and decides when and how it resolves.

#![allow(dead_code)]

use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use futures::channel::mpsc as link;
use tokio::sync::{mpsc, oneshot};

use room_sync::{
    Connector, HistoryFetchError, HistorySource, Link, Message, Room, RoomSession, Timestamp,
    TransportError,
};

/// How long a single step may take before the test is considered stuck.
pub const STEP: Duration = Duration::from_secs(2);

pub struct HistoryRequest {
    pub room: String,
    pub respond: oneshot::Sender<Result<Vec<Message>, HistoryFetchError>>,
}

impl HistoryRequest {
    /// The request may already have been cancelled; that is not an error.
    pub fn reply(self, messages: Vec<Message>) {
        let _ = self.respond.send(Ok(messages));
    }

    pub fn fail(self, err: HistoryFetchError) {
        let _ = self.respond.send(Err(err));
    }
}

#[derive(Clone)]
pub struct ScriptedHistory {
    requests: mpsc::UnboundedSender<HistoryRequest>,
}

impl ScriptedHistory {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HistoryRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }
}

impl HistorySource for ScriptedHistory {
    async fn fetch(&self, room: &Room) -> Result<Vec<Message>, HistoryFetchError> {
        let (respond, response) = oneshot::channel();
        self.requests
            .send(HistoryRequest {
                room: room.name().to_string(),
                respond,
            })
            .map_err(|_| HistoryFetchError::Unavailable)?;
        response.await.unwrap_or(Err(HistoryFetchError::Unavailable))
    }
}

/// The server's half of one link.
pub struct RemoteEnd {
    pub room: String,
    pub to_client: link::UnboundedSender<Result<String, TransportError>>,
    pub from_client: link::UnboundedReceiver<String>,
    gate: Option<oneshot::Sender<bool>>,
}

impl RemoteEnd {
    /// Completes the handshake.
    pub fn accept(&mut self) {
        if let Some(gate) = self.gate.take() {
            let _ = gate.send(true);
        }
    }

    /// Fails the handshake.
    pub fn reject(&mut self) {
        if let Some(gate) = self.gate.take() {
            let _ = gate.send(false);
        }
    }

    pub fn push(&self, frame: &str) {
        let _ = self.to_client.unbounded_send(Ok(frame.to_string()));
    }

    /// Next frame the client sent, or `None` once the client closed.
    pub async fn next_sent(&mut self) -> Option<String> {
        tokio::time::timeout(STEP, self.from_client.next())
            .await
            .expect("client sent nothing")
    }

    /// True once the client gave up on a handshake the test never resolved.
    pub fn handshake_cancelled(&self) -> bool {
        self.gate.as_ref().is_some_and(|g| g.is_closed())
    }
}

#[derive(Clone)]
pub struct ScriptedConnector {
    remotes: mpsc::UnboundedSender<RemoteEnd>,
    auto_accept: bool,
}

impl ScriptedConnector {
    /// Every handshake waits for [`RemoteEnd::accept`].
    pub fn gated() -> (Self, mpsc::UnboundedReceiver<RemoteEnd>) {
        let (remotes, rx) = mpsc::unbounded_channel();
        (
            Self {
                remotes,
                auto_accept: false,
            },
            rx,
        )
    }

    /// Every handshake succeeds immediately.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<RemoteEnd>) {
        let (remotes, rx) = mpsc::unbounded_channel();
        (
            Self {
                remotes,
                auto_accept: true,
            },
            rx,
        )
    }
}

impl Connector for ScriptedConnector {
    async fn connect(&self, room: &Room) -> Result<Link, TransportError> {
        let (to_client, inbound) = link::unbounded();
        let (outbound, from_client) = link::unbounded::<String>();
        let (gate_tx, gate_rx) = oneshot::channel();
        let gate = (!self.auto_accept).then_some(gate_tx);

        self.remotes
            .send(RemoteEnd {
                room: room.name().to_string(),
                to_client,
                from_client,
                gate,
            })
            .map_err(|_| TransportError::Unavailable)?;

        if !self.auto_accept && !gate_rx.await.unwrap_or(false) {
            return Err(TransportError::Unavailable);
        }
        Ok(Link {
            sink: Box::pin(outbound.sink_map_err(|_| TransportError::UnexpectedClose)),
            stream: inbound.boxed(),
        })
    }
}

pub fn msg(author: &str, text: &str, ts: &str) -> Message {
    Message::new(Some(author), text, Timestamp::new(ts))
}

pub fn flat_frame(author: &str, text: &str, ts: &str) -> String {
    serde_json::json!({ "message": text, "username": author, "timestamp": ts }).to_string()
}

pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(STEP, rx.recv())
        .await
        .expect("timed out waiting")
        .expect("channel closed")
}

/// Handles exactly one asynchronous result.
pub async fn pump<H: HistorySource, C: Connector>(session: &mut RoomSession<H, C>) {
    let event = tokio::time::timeout(STEP, session.next_event())
        .await
        .expect("session made no progress");
    session.handle_event(event);
}

/// Handles results until `done` holds.
pub async fn pump_until<H, C, F>(session: &mut RoomSession<H, C>, done: F)
where
    H: HistorySource,
    C: Connector,
    F: Fn(&RoomSession<H, C>) -> bool,
{
    while !done(session) {
        pump(session).await;
    }
}

pub fn texts<H, C>(session: &RoomSession<H, C>) -> Vec<String>
where
    H: HistorySource,
    C: Connector,
{
    session
        .view()
        .entries()
        .iter()
        .map(|e| format!("{}: {}", e.author, e.text))
        .collect()
}
