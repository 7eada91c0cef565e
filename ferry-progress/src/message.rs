//! Outgoing push messages.

use bytes::Bytes;

use crate::error::PushResult;
use crate::tracker::UploadProgress;

/// A message queued for a subscriber's socket.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// JSON text frame.
    Text(String),
    /// Reply to a client ping.
    Pong(Bytes),
    /// Close the socket after flushing.
    Close,
}

impl PushMessage {
    /// Serialize a progress snapshot.
    pub fn progress(progress: &UploadProgress) -> PushResult<Self> {
        Ok(Self::Text(serde_json::to_string(progress)?))
    }

    /// Get the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Check if this is a close message.
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close)
    }
}

impl From<PushMessage> for tungstenite::Message {
    fn from(msg: PushMessage) -> Self {
        match msg {
            PushMessage::Text(text) => tungstenite::Message::Text(text.into()),
            PushMessage::Pong(data) => tungstenite::Message::Pong(data),
            PushMessage::Close => tungstenite::Message::Close(None),
        }
    }
}
