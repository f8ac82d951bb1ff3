use anyhow::{ensure, Result};

use heartline_common::{ClientFrame, ServerFrame};

use crate::api::Api;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Me,
    Them,
}

/// One line of the conversation. Lives in memory for the duration of the
/// session only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
}

/// Why the session is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEnd {
    /// The server signalled we are not in an active session any more.
    Inactive,

    /// The channel closed without any failure signal.
    Disconnected,
}

/// What a single inbound signal did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStep {
    /// A line from the other party landed in the log.
    Appended,

    /// First end-of-session signal; act on it once.
    Ended(ChatEnd),

    /// Post-end noise.
    Ignored,
}

/// The chat itself: an append-only message log plus a one-shot end guard.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    end: Option<ChatEnd>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn end(&self) -> Option<ChatEnd> {
        self.end
    }

    /// Optimistic local echo: the line is logged as ours immediately and the
    /// frame to transmit is handed back. No acknowledgment is awaited and the
    /// echo is never reconciled against the server.
    pub fn compose(&mut self, text: &str) -> ClientFrame {
        self.messages.push(ChatMessage {
            speaker: Speaker::Me,
            text: text.to_string(),
        });
        ClientFrame::chat(text)
    }

    /// Feed one inbound frame. A chat line appends; any other shape means
    /// the session is dead — same semantics as a failed match, signalled at
    /// most once, appending nothing.
    pub fn apply_frame(&mut self, frame: &ServerFrame) -> ChatStep {
        if self.end.is_some() {
            return ChatStep::Ignored;
        }
        match frame {
            ServerFrame::Message { text } => {
                self.messages.push(ChatMessage {
                    speaker: Speaker::Them,
                    text: text.clone(),
                });
                ChatStep::Appended
            }
            ServerFrame::Matched | ServerFrame::Failed | ServerFrame::Unrecognized => {
                self.end = Some(ChatEnd::Inactive);
                ChatStep::Ended(ChatEnd::Inactive)
            }
        }
    }

    /// The channel closing with no prior failure signal is a quiet end.
    pub fn apply_close(&mut self) -> ChatStep {
        if self.end.is_some() {
            return ChatStep::Ignored;
        }
        self.end = Some(ChatEnd::Disconnected);
        ChatStep::Ended(ChatEnd::Disconnected)
    }
}

/// Submit the end-of-session rating. Out-of-range values are rejected before
/// anything goes on the wire.
pub async fn submit_rating(api: &Api, rating: u8) -> Result<()> {
    ensure!((1..=5).contains(&rating), "rating must be between 1 and 5");
    api.submit_rating(rating).await?;
    Ok(())
}
