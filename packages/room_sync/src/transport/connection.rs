use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ConnectionEvent, ConnectionId, Connector, FrameSink, Link};
use crate::error::TransportError;
use crate::model::Room;

/// How long a retiring connection may spend on its close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Runs one connection from handshake to close.
///
/// Reports to `events` and takes payloads from `outbound`. Ends when the
/// link fails, the server closes, or the manager drops either channel.
pub(super) async fn drive<C: Connector>(
    connector: C,
    id: ConnectionId,
    room: Room,
    handshake_timeout: Duration,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let link = match tokio::time::timeout(handshake_timeout, connector.connect(&room)).await {
        Ok(Ok(link)) => link,
        Ok(Err(err)) => {
            warn!(%id, %room, error = %err, "connection failed");
            let _ = events.send(ConnectionEvent::Closed(Some(err)));
            return;
        }
        Err(_) => {
            warn!(%id, %room, "handshake timed out");
            let _ = events.send(ConnectionEvent::Closed(Some(
                TransportError::HandshakeTimeout(handshake_timeout),
            )));
            return;
        }
    };

    let Link {
        mut sink,
        mut stream,
    } = link;

    if events.send(ConnectionEvent::Opened).is_err() {
        close_quietly(id, &mut sink).await;
        return;
    }

    loop {
        tokio::select! {
            payload = outbound.recv() => match payload {
                Some(text) => {
                    if let Err(err) = sink.send(text).await {
                        warn!(%id, error = %err, "send failed");
                        let _ = events.send(ConnectionEvent::Closed(Some(err)));
                        return;
                    }
                }
                None => {
                    close_quietly(id, &mut sink).await;
                    return;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    if events.send(ConnectionEvent::Frame(text)).is_err() {
                        close_quietly(id, &mut sink).await;
                        return;
                    }
                }
                Some(Err(err)) => {
                    let _ = events.send(ConnectionEvent::Closed(Some(err)));
                    return;
                }
                None => {
                    let _ = events.send(ConnectionEvent::Closed(None));
                    return;
                }
            },
        }
    }
}

async fn close_quietly(id: ConnectionId, sink: &mut FrameSink) {
    match tokio::time::timeout(CLOSE_GRACE, sink.close()).await {
        Ok(Ok(())) => debug!(%id, "connection closed"),
        Ok(Err(err)) => debug!(%id, error = %err, "error while closing, ignored"),
        Err(_) => debug!(%id, "close handshake timed out, dropping link"),
    }
}
