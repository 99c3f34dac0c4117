use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Failures of the live connection: handshake, send, or an unexpected close.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("chat server is unavailable")]
    Unavailable,

    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("connection closed unexpectedly")]
    UnexpectedClose,

    #[error(transparent)]
    WebSocket(tungstenite::Error),
}

impl TransportError {
    pub fn from_tungstenite(err: tungstenite::Error) -> Self {
        let is_connect = match &err {
            tungstenite::Error::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                return Self::UnexpectedClose;
            }
            _ => false,
        };
        if is_connect {
            Self::Unavailable
        } else {
            Self::WebSocket(err)
        }
    }
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        Self::from_tungstenite(err)
    }
}

/// Failures of the one-shot history request issued on every room switch.
#[derive(Debug, thiserror::Error)]
pub enum HistoryFetchError {
    #[error("history server is unavailable")]
    Unavailable,

    #[error("history request failed with status {0}")]
    Status(u16),

    #[error("malformed history payload: {0}")]
    Malformed(String),

    #[error("history request timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Request(reqwest::Error),
}

impl HistoryFetchError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unavailable
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Request(err)
        }
    }
}

/// Reasons an outbound message is rejected before it reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message text is empty")]
    EmptyText,

    #[error("no open connection for the active room")]
    NotConnected,

    #[error("message could not be encoded: {0}")]
    Unencodable(String),
}

/// An inbound frame that matches none of the known shapes.
#[derive(Debug, thiserror::Error)]
#[error("undecodable frame: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// A base URL the endpoints cannot be derived from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid base url {url:?}: {reason}")]
pub struct EndpointError {
    pub url: String,
    pub reason: String,
}
