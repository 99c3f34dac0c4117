//! The input field and the path from typed text to an outbound frame.

use tracing::debug;

use crate::error::ValidationError;
use crate::model::{Generation, Message, Timestamp, normalize_author};
use crate::transport::{Connector, TransportManager};
use crate::wire::encode_outbound;

/// Keys the single-line input reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Submit; same as the send action.
    Enter,
    Backspace,
    Char(char),
}

/// User interaction with the input area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputAction {
    /// Replace the field's contents.
    SetText(String),
    KeyPress(Key),
    /// The explicit send control.
    SendClicked,
}

/// Single-line text input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputField {
    text: String,
}

impl InputField {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// Turns the input field into outbound messages for the current identity.
#[derive(Debug)]
pub struct OutboundComposer {
    identity: String,
    field: InputField,
}

impl OutboundComposer {
    /// `identity` of `None` sends as the anonymous author.
    pub fn new(identity: Option<&str>) -> Self {
        Self {
            identity: normalize_author(identity),
            field: InputField::default(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn field(&self) -> &InputField {
        &self.field
    }

    /// Applies an edit. Returns true when the action asks for a submit.
    pub fn edit(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::SetText(text) => {
                self.field.set(text);
                false
            }
            InputAction::KeyPress(Key::Char(c)) => {
                // Single line: a newline is a submit, not content.
                if c == '\n' || c == '\r' {
                    return true;
                }
                self.field.text.push(c);
                false
            }
            InputAction::KeyPress(Key::Backspace) => {
                self.field.text.pop();
                false
            }
            InputAction::KeyPress(Key::Enter) | InputAction::SendClicked => true,
        }
    }

    /// Validates the field, sends it on the connection owned by
    /// `generation`, and clears the field.
    ///
    /// On rejection nothing is sent and the field is left as it was.
    pub fn compose<C: Connector>(
        &mut self,
        transport: &mut TransportManager<C>,
        generation: Generation,
    ) -> Result<Message, ValidationError> {
        let text = self.field.text().trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if !transport.is_open_for(generation) {
            return Err(ValidationError::NotConnected);
        }

        let message = Message::new(Some(&self.identity), text, Timestamp::default());
        let payload =
            encode_outbound(&message).map_err(|e| ValidationError::Unencodable(e.to_string()))?;
        if !transport.send(generation, payload) {
            return Err(ValidationError::NotConnected);
        }

        debug!(%generation, chars = message.text.len(), "message sent");
        self.field.clear();
        Ok(message)
    }
}
