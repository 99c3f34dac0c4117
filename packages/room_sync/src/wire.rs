//! JSON shapes exchanged with the history and live-stream endpoints.
//!
//! The server has emitted several spellings of the same record over time
//! (`username`/`user`, `content`/`message`, `timestamp`/`created_at`), and
//! live frames arrive either flat or tagged with a `type`. Everything is
//! normalised into [`Message`] here so the rest of the crate sees one shape.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::model::{Message, Timestamp};

/// A message record as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    #[serde(default, alias = "username", alias = "user")]
    pub author: Option<String>,
    #[serde(alias = "content", alias = "message")]
    pub text: String,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<String>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message::new(
            wire.author.as_deref(),
            wire.text,
            Timestamp::new(wire.timestamp.unwrap_or_default()),
        )
    }
}

/// Body of the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryPayload {
    pub messages: Vec<WireMessage>,
}

impl HistoryPayload {
    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into_iter().map(Message::from).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedFrame {
    Message { message: WireMessage },
    RecentMessages { messages: Vec<WireMessage> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFrame {
    Tagged(TaggedFrame),
    Flat(WireMessage),
}

/// A decoded live-stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// One live message.
    Message(Message),
    /// A batch of recent messages sent on connect; treated as history.
    Batch(Vec<Message>),
}

pub fn decode_frame(text: &str) -> Result<InboundFrame, DecodeError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    Ok(match raw {
        RawFrame::Tagged(TaggedFrame::Message { message }) => {
            InboundFrame::Message(message.into())
        }
        RawFrame::Tagged(TaggedFrame::RecentMessages { messages }) => {
            InboundFrame::Batch(messages.into_iter().map(Message::from).collect())
        }
        RawFrame::Flat(message) => InboundFrame::Message(message.into()),
    })
}

/// A message on its way to the server.
#[derive(Debug, Serialize)]
pub struct OutboundFrame<'a> {
    pub message: &'a str,
    pub username: &'a str,
}

pub fn encode_outbound(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutboundFrame {
        message: &message.text,
        username: &message.author,
    })
}
