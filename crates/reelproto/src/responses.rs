//! Messages sent by the server.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// An outbound message. Serialized as a JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Media is rendered far enough for playback to start.
    Ready,
    /// A chunk of rendered frames, oldest first.
    Frame { data: Vec<String> },
    /// No frames remain. Precedes the final (possibly empty) `frame`.
    FramesEnd,
    /// Base64 encoded DFPWM bytes.
    Audio { data: String },
    /// No audio remains.
    AudioEnd,
    Error { message: String },
}

impl ServerMessage {
    pub fn audio(bytes: &[u8]) -> Self {
        ServerMessage::Audio {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Decoded payload of an `audio` message.
    pub fn audio_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        match self {
            ServerMessage::Audio { data } => {
                Some(base64::engine::general_purpose::STANDARD.decode(data))
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
