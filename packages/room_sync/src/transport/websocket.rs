use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::tungstenite;
use tracing::debug;

use super::{Connector, Link};
use crate::endpoints::ChatEndpoints;
use crate::error::TransportError;
use crate::model::Room;

/// Connects to `ws(s)://{host}/ws/chat/{room}/`.
///
/// Only text frames are surfaced; pings are answered by tungstenite and a
/// close frame ends the stream.
#[derive(Clone, Debug)]
pub struct WsConnector {
    endpoints: ChatEndpoints,
}

impl WsConnector {
    pub fn new(endpoints: ChatEndpoints) -> Self {
        Self { endpoints }
    }
}

impl Connector for WsConnector {
    async fn connect(&self, room: &Room) -> Result<Link, TransportError> {
        let url = self.endpoints.stream_url(room);
        debug!(%url, "connecting");
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(TransportError::from_tungstenite)?;

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(TransportError::from_tungstenite)
            .with(|text: String| {
                future::ready(Ok::<_, TransportError>(tungstenite::Message::Text(
                    text.into(),
                )))
            });

        let stream = read.filter_map(|item| {
            future::ready(match item {
                Ok(tungstenite::Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::from_tungstenite(err))),
            })
        });

        Ok(Link {
            sink: Box::pin(sink),
            stream: stream.boxed(),
        })
    }
}
