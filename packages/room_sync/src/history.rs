//! One history request per room switch, settled at most once per generation.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::endpoints::ChatEndpoints;
use crate::error::HistoryFetchError;
use crate::model::{Generation, Message, Room};
use crate::wire::HistoryPayload;

/// Where past messages for a room come from.
pub trait HistorySource: Clone + Send + Sync + 'static {
    /// Returns the room's recent messages in server order.
    fn fetch(
        &self,
        room: &Room,
    ) -> impl Future<Output = Result<Vec<Message>, HistoryFetchError>> + Send;
}

/// History over the chat server's JSON endpoint.
#[derive(Clone, Debug)]
pub struct HttpHistory {
    client: reqwest::Client,
    endpoints: ChatEndpoints,
}

impl HttpHistory {
    pub fn new(endpoints: ChatEndpoints) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints)
    }

    pub fn with_client(client: reqwest::Client, endpoints: ChatEndpoints) -> Self {
        Self { client, endpoints }
    }
}

impl HistorySource for HttpHistory {
    async fn fetch(&self, room: &Room) -> Result<Vec<Message>, HistoryFetchError> {
        let url = self.endpoints.history_url(room);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(HistoryFetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryFetchError::Status(status.as_u16()));
        }

        let payload: HistoryPayload = response
            .json()
            .await
            .map_err(HistoryFetchError::from_reqwest)?;
        Ok(payload.into_messages())
    }
}

/// The outcome of one history request, tagged with the generation that
/// issued it.
#[derive(Debug)]
pub struct HistoryBatch {
    pub generation: Generation,
    pub room: Room,
    pub result: Result<Vec<Message>, HistoryFetchError>,
}

struct InFlight {
    generation: Generation,
    task: JoinHandle<()>,
}

/// Issues history requests and decides which batch, if any, settles a
/// generation.
///
/// A generation is *pending* from [`fetch`](Self::fetch) until its first
/// batch is accepted, whether that batch came from the endpoint or from a
/// `recent_messages` frame on the live stream. Anything after that is
/// ignored.
pub struct HistoryLoader<H> {
    source: H,
    timeout: Duration,
    results_tx: mpsc::UnboundedSender<HistoryBatch>,
    results_rx: mpsc::UnboundedReceiver<HistoryBatch>,
    in_flight: Option<InFlight>,
}

impl<H: HistorySource> HistoryLoader<H> {
    pub fn new(source: H, timeout: Duration) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            source,
            timeout,
            results_tx,
            results_rx,
            in_flight: None,
        }
    }

    /// Starts the request for `generation`, cancelling any older one.
    pub fn fetch(&mut self, room: &Room, generation: Generation) {
        self.cancel();

        let source = self.source.clone();
        let room = room.clone();
        let limit = self.timeout;
        let results = self.results_tx.clone();
        let task = tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, source.fetch(&room)).await {
                Ok(result) => result,
                Err(_) => Err(HistoryFetchError::Timeout(limit)),
            };
            let _ = results.send(HistoryBatch {
                generation,
                room,
                result,
            });
        });

        self.in_flight = Some(InFlight { generation, task });
    }

    /// Drops the outstanding request, if any. Its generation stops being pending.
    pub fn cancel(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
            debug!(generation = %in_flight.generation, "history request cancelled");
        }
    }

    pub fn is_pending(&self, generation: Generation) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
    }

    /// Waits for the next completed request. Never resolves while idle.
    pub async fn next_batch(&mut self) -> HistoryBatch {
        match self.results_rx.recv().await {
            Some(batch) => batch,
            // The loader holds a sender, so the channel never closes.
            None => std::future::pending().await,
        }
    }

    /// Accepts `batch` if it settles the pending generation.
    ///
    /// Returns `None` for batches that arrive for any other generation or
    /// after the generation was already settled.
    pub fn settle(
        &mut self,
        batch: HistoryBatch,
    ) -> Option<Result<Vec<Message>, HistoryFetchError>> {
        if !self.is_pending(batch.generation) {
            debug!(
                generation = %batch.generation,
                room = %batch.room,
                "dropping history for a settled or superseded generation"
            );
            return None;
        }
        self.in_flight = None;
        if let Err(err) = &batch.result {
            warn!(room = %batch.room, error = %err, "history fetch failed");
        }
        Some(batch.result)
    }

    /// Offers a batch received on the live stream as this generation's
    /// history. Accepted only while the generation is still pending, in
    /// which case the outstanding request is cancelled.
    pub fn offer_stream_batch(
        &mut self,
        generation: Generation,
        messages: Vec<Message>,
    ) -> Option<Vec<Message>> {
        if !self.is_pending(generation) {
            debug!(%generation, "ignoring recent_messages batch, history already settled");
            return None;
        }
        self.cancel();
        Some(messages)
    }
}

impl<H> Drop for HistoryLoader<H> {
    fn drop(&mut self) {
        if let Some(in_flight) = &self.in_flight {
            in_flight.task.abort();
        }
    }
}
