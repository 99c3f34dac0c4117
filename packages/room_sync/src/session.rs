//! Room-switch orchestration.
//!
//! [`RoomSession`] is the only writer of [`Session`]. Every switch bumps the
//! generation, clears the view, and starts the history request and the live
//! connection side by side. Everything that comes back asynchronously is
//! tagged with the generation that started it and dropped if that
//! generation is no longer current.
//!
//! Live messages that arrive before the generation's history has settled
//! are held and rendered right after it, so history always precedes live
//! traffic in the view.

use std::mem;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::compose::{InputAction, OutboundComposer};
use crate::config::{ReconnectPolicy, SyncConfig};
use crate::history::{HistoryBatch, HistoryLoader, HistorySource};
use crate::location::{Location, MemoryLocation};
use crate::model::{Generation, Message, RoomDirectory, Session};
use crate::render::{MessageRenderer, View, ViewChange};
use crate::transport::{ConnectionEvent, ConnectionState, Connector, TransportManager};
use crate::wire::{InboundFrame, decode_frame};

/// User-driven requests handled by [`RoomSession::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SwitchRoom(String),
    Input(InputAction),
    Shutdown,
}

/// Asynchronous results delivered to the session.
#[derive(Debug)]
pub enum SessionEvent {
    History(HistoryBatch),
    Connection {
        generation: Generation,
        event: ConnectionEvent,
    },
    ReconnectDue {
        generation: Generation,
    },
}

pub struct RoomSession<H, C> {
    session: Session,
    directory: RoomDirectory,
    history: HistoryLoader<H>,
    transport: TransportManager<C>,
    renderer: MessageRenderer,
    composer: OutboundComposer,
    location: Box<dyn Location>,
    reconnect: ReconnectPolicy,
    reconnect_attempts: u32,
    reconnect_tx: mpsc::UnboundedSender<Generation>,
    reconnect_rx: mpsc::UnboundedReceiver<Generation>,
    /// Live messages for the current generation awaiting its history.
    held_live: Vec<Message>,
}

impl<H: HistorySource, C: Connector> RoomSession<H, C> {
    pub fn new(directory: RoomDirectory, history: H, connector: C, config: &SyncConfig) -> Self {
        let (reconnect_tx, reconnect_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::default(),
            directory,
            history: HistoryLoader::new(history, config.history_timeout),
            transport: TransportManager::new(connector, config.handshake_timeout),
            renderer: MessageRenderer::new(),
            composer: OutboundComposer::new(None),
            location: Box::new(MemoryLocation::default()),
            reconnect: config.reconnect.clone(),
            reconnect_attempts: 0,
            reconnect_tx,
            reconnect_rx,
            held_live: Vec::new(),
        }
    }

    /// Author used for outbound messages; `None` is anonymous.
    pub fn with_identity(mut self, identity: Option<&str>) -> Self {
        self.composer = OutboundComposer::new(identity);
        self
    }

    pub fn with_location(mut self, location: impl Location + 'static) -> Self {
        self.location = Box::new(location);
        self
    }

    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<ViewChange>) -> Self {
        self.renderer.set_observer(observer);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    pub fn view(&self) -> &View {
        self.renderer.view()
    }

    pub fn composer(&self) -> &OutboundComposer {
        &self.composer
    }

    pub fn transport(&self) -> &TransportManager<C> {
        &self.transport
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Performs the initial switch, if there is a room to switch to.
    ///
    /// Preference: `requested`, then the recorded location, then the first
    /// room of the directory. A requested or recorded room that is not in
    /// the directory is skipped.
    pub fn start(&mut self, requested: Option<&str>) -> bool {
        let recorded = self.location.read();
        let initial = [requested, recorded.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|name| {
                let room = self.directory.get(name);
                if room.is_none() {
                    warn!(room = name, "initial room is not in the directory");
                }
                room
            })
            .or_else(|| self.directory.first())
            .cloned();

        match initial {
            Some(room) => self.switch_to(room.name()),
            None => {
                info!("no rooms to join");
                false
            }
        }
    }

    /// Makes `name` the active room. Returns false when nothing changed:
    /// the room is unknown or already active.
    pub fn switch_to(&mut self, name: &str) -> bool {
        let Some(room) = self.directory.get(name).cloned() else {
            warn!(room = name, "cannot switch to unknown room");
            return false;
        };
        if self.session.active_room() == Some(&room) {
            debug!(%room, "already in room");
            return false;
        }

        self.transport.close();
        let generation = self.session.advance(room.clone());
        self.held_live.clear();
        self.reconnect_attempts = 0;

        self.renderer.clear(&room);
        self.location.write(&room);
        self.history.fetch(&room, generation);
        self.transport.open(&room, generation);

        info!(%room, %generation, "switched room");
        true
    }

    pub fn handle_input(&mut self, action: InputAction) {
        if self.composer.edit(action) {
            self.submit();
        }
    }

    fn submit(&mut self) {
        let generation = self.session.generation();
        if let Err(err) = self.composer.compose(&mut self.transport, generation) {
            debug!(%generation, error = %err, "send rejected");
        }
    }

    /// Waits for the next asynchronous result.
    pub async fn next_event(&mut self) -> SessionEvent {
        tokio::select! {
            batch = self.history.next_batch() => SessionEvent::History(batch),
            (generation, event) = self.transport.next_event() => {
                SessionEvent::Connection { generation, event }
            }
            generation = next_reconnect(&mut self.reconnect_rx) => {
                SessionEvent::ReconnectDue { generation }
            }
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::History(batch) => self.on_history(batch),
            SessionEvent::Connection { generation, event } => {
                self.on_connection_event(generation, event)
            }
            SessionEvent::ReconnectDue { generation } => self.on_reconnect_due(generation),
        }
    }

    /// Drives the session until `Shutdown` or until `commands` closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::SwitchRoom(name)) => {
                        self.switch_to(&name);
                    }
                    Some(Command::Input(action)) => self.handle_input(action),
                    Some(Command::Shutdown) | None => break,
                },
                event = self.next_event() => self.handle_event(event),
            }
        }
        self.shutdown();
    }

    /// Closes the connection and abandons any outstanding request.
    pub fn shutdown(&mut self) {
        self.history.cancel();
        self.transport.close();
        info!("session shut down");
    }

    fn on_history(&mut self, batch: HistoryBatch) {
        if !self.session.is_current(batch.generation) {
            debug!(generation = %batch.generation, room = %batch.room, "dropping stale history");
            return;
        }
        match self.history.settle(batch) {
            Some(Ok(messages)) => self.render_history(&messages),
            // Already logged by the loader; the room shows empty history.
            Some(Err(_)) => self.render_history(&[]),
            None => {}
        }
    }

    fn on_connection_event(&mut self, generation: Generation, event: ConnectionEvent) {
        if !self.session.is_current(generation) {
            debug!(%generation, "dropping event from stale connection");
            return;
        }
        match event {
            // A link that opens and then drops without carrying anything
            // still counts as a failed attempt.
            ConnectionEvent::Opened => {
                info!(room = ?self.session.active_room(), %generation, "connection open");
            }
            ConnectionEvent::Frame(text) => {
                self.reconnect_attempts = 0;
                self.on_frame(generation, &text);
            }
            ConnectionEvent::Closed(reason) => {
                match reason {
                    Some(err) => warn!(%generation, error = %err, "connection closed"),
                    None => info!(%generation, "connection closed by server"),
                }
                self.schedule_reconnect(generation);
            }
        }
    }

    fn on_frame(&mut self, generation: Generation, text: &str) {
        match decode_frame(text) {
            Ok(InboundFrame::Message(message)) => {
                if self.history.is_pending(generation) {
                    self.held_live.push(message);
                } else {
                    self.renderer.append(&message);
                }
            }
            Ok(InboundFrame::Batch(messages)) => {
                if let Some(messages) = self.history.offer_stream_batch(generation, messages) {
                    self.render_history(&messages);
                }
            }
            Err(err) => warn!(%generation, error = %err, "skipping frame"),
        }
    }

    /// Renders the generation's history, then whatever live traffic was
    /// held back waiting for it.
    fn render_history(&mut self, messages: &[Message]) {
        for message in messages {
            self.renderer.append(message);
        }
        // Each history entry accounts for at most one held message.
        let mut unmatched: Vec<&Message> = messages.iter().collect();
        for message in mem::take(&mut self.held_live) {
            if let Some(i) = unmatched.iter().position(|m| **m == message) {
                unmatched.swap_remove(i);
                debug!("live message already in history, skipped");
                continue;
            }
            self.renderer.append(&message);
        }
    }

    fn schedule_reconnect(&mut self, generation: Generation) {
        let Some(delay) = self.reconnect.delay_for(self.reconnect_attempts) else {
            if self.reconnect.max_attempts > 0 {
                warn!(%generation, "giving up on reconnecting");
            }
            return;
        };
        self.reconnect_attempts += 1;
        debug!(%generation, attempt = self.reconnect_attempts, ?delay, "reconnect scheduled");

        let due = self.reconnect_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = due.send(generation);
        });
    }

    fn on_reconnect_due(&mut self, generation: Generation) {
        if !self.session.is_current(generation) {
            debug!(%generation, "dropping stale reconnect");
            return;
        }
        if self.transport.state().is_active() {
            return;
        }
        if let Some(room) = self.session.active_room().cloned() {
            info!(%room, %generation, attempt = self.reconnect_attempts, "reconnecting");
            self.transport.open(&room, generation);
        }
    }
}

async fn next_reconnect(rx: &mut mpsc::UnboundedReceiver<Generation>) -> Generation {
    match rx.recv().await {
        Some(generation) => generation,
        // The session holds a sender, so the channel never closes.
        None => std::future::pending().await,
    }
}
