//! The visible message list and the renderer that appends to it.

use maud::{Markup, html};
use tokio::sync::mpsc;

use crate::model::{Message, Room};

/// One rendered line of the chat log. Author and text are plain text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewEntry {
    pub author: String,
    pub text: String,
    /// Human-readable timestamp.
    pub timestamp: String,
}

impl ViewEntry {
    fn from_message(message: &Message) -> Self {
        Self {
            author: message.author.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp.display(),
        }
    }

    /// Single terminal line with control characters removed, so remote
    /// text cannot smuggle escape sequences onto the user's terminal.
    pub fn terminal_line(&self) -> String {
        let author = sanitize_for_terminal(&self.author);
        let text = sanitize_for_terminal(&self.text);
        if self.timestamp.is_empty() {
            format!("{author}: {text}")
        } else {
            format!("[{}] {author}: {text}", sanitize_for_terminal(&self.timestamp))
        }
    }
}

/// Newlines and tabs become spaces; every other control character is dropped.
pub fn sanitize_for_terminal(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect()
}

/// Change notifications for whoever is displaying the view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewChange {
    /// The view was emptied because `room` became active.
    Cleared { room: Room },
    Appended(ViewEntry),
}

/// Ordered, append-only list of entries plus the scroll position.
#[derive(Debug, Default)]
pub struct View {
    entries: Vec<ViewEntry>,
    scroll: Option<usize>,
}

impl View {
    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry scrolled into view; always the newest one.
    pub fn scroll(&self) -> Option<usize> {
        self.scroll
    }

    /// Renders the log as HTML. Every interpolated value is escaped.
    pub fn to_html(&self) -> Markup {
        html! {
            div.chat-log {
                @for entry in &self.entries {
                    div.message {
                        div { strong { (entry.author) } }
                        div { (entry.text) }
                        div.meta { (entry.timestamp) }
                    }
                }
            }
        }
    }
}

/// Appends messages to the [`View`].
///
/// Knows nothing about rooms' generations: callers filter stale messages
/// before they get here.
#[derive(Debug, Default)]
pub struct MessageRenderer {
    view: View,
    observer: Option<mpsc::UnboundedSender<ViewChange>>,
}

impl MessageRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: mpsc::UnboundedSender<ViewChange>) -> Self {
        Self {
            view: View::default(),
            observer: Some(observer),
        }
    }

    pub fn set_observer(&mut self, observer: mpsc::UnboundedSender<ViewChange>) {
        self.observer = Some(observer);
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn append(&mut self, message: &Message) {
        let entry = ViewEntry::from_message(message);
        self.view.entries.push(entry.clone());
        self.view.scroll = Some(self.view.entries.len() - 1);
        self.notify(ViewChange::Appended(entry));
    }

    pub fn clear(&mut self, room: &Room) {
        self.view.entries.clear();
        self.view.scroll = None;
        self.notify(ViewChange::Cleared { room: room.clone() });
    }

    fn notify(&mut self, change: ViewChange) {
        if let Some(observer) = &self.observer {
            if observer.send(change).is_err() {
                self.observer = None;
            }
        }
    }
}
