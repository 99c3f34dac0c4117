use reqwest::Url;

use crate::error::EndpointError;
use crate::model::Room;

/// Derives the history, live-stream and deep-link addresses for a room
/// from the chat server's base URL.
///
/// Room names are pushed as single path segments, so they are
/// percent-encoded and can never escape their segment.
#[derive(Clone, Debug)]
pub struct ChatEndpoints {
    base: Url,
}

impl ChatEndpoints {
    pub fn new(base_url: &str) -> Result<Self, EndpointError> {
        let invalid = |reason: &str| EndpointError {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };
        let base = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(invalid("url has no host"));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET {base}/chat/api/messages/{room}/`
    pub fn history_url(&self, room: &Room) -> Url {
        self.with_segments(&["chat", "api", "messages", room.name(), ""])
    }

    /// `ws(s)://{host}/ws/chat/{room}/`, scheme following the base URL.
    pub fn stream_url(&self, room: &Room) -> Url {
        let mut url = self.with_segments(&["ws", "chat", room.name(), ""]);
        let scheme = if self.base.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        // http(s) -> ws(s) stays within the special schemes and cannot fail.
        let _ = url.set_scheme(scheme);
        url
    }

    /// The addressable location of a room: `{base}/chat/?room_name={room}`.
    pub fn deep_link(&self, room: &Room) -> Url {
        let mut url = self.with_segments(&["chat", ""]);
        url.query_pairs_mut().append_pair("room_name", room.name());
        url
    }

    fn with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
