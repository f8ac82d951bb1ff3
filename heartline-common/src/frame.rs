use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server frames. Shapes are fixed by the backend contract,
/// so these serialize to bare objects rather than tagged variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientFrame {
    /// First frame on every connection: hands over the session credential.
    Handshake { sessid: String },

    /// A chat line during an active session.
    Chat { message: String },
}

impl ClientFrame {
    pub fn handshake(sessid: impl Into<String>) -> Self {
        Self::Handshake {
            sessid: sessid.into(),
        }
    }

    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
        }
    }
}

/// Server → client frames, decoded at the channel boundary.
///
/// The server is only ever expected to send the three recognized shapes;
/// everything else (unknown objects, non-object JSON, garbage text) lands in
/// `Unrecognized` so consumers can treat it as a resync trigger instead of a
/// hard protocol error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// `{"event": "matched"}` — a partner was found.
    Matched,

    /// `{"event": "failed"}` — matching gave up.
    Failed,

    /// `{"message": <text>}` — a chat line from the other party.
    Message { text: String },

    /// Anything outside the contract, malformed input included.
    Unrecognized,
}

impl ServerFrame {
    /// Decoding never fails; unknown input maps to `Unrecognized`.
    pub fn decode(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return Self::Unrecognized;
        };

        if let Some(event) = value.get("event").and_then(Value::as_str) {
            return match event {
                "matched" => Self::Matched,
                "failed" => Self::Failed,
                _ => Self::Unrecognized,
            };
        }

        if let Some(text) = value.get("message").and_then(Value::as_str) {
            return Self::Message {
                text: text.to_string(),
            };
        }

        Self::Unrecognized
    }
}
