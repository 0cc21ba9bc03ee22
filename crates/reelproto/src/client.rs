//! Messages sent by the client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversion;

/// Every `type` the server understands.
pub const CLIENT_MESSAGE_TYPES: &[&str] =
    &["init", "get_frames", "get_audio", "get_media", "stop", "seek"];

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a session for a terminal of the given size and frame rate.
    Init {
        #[serde(deserialize_with = "conversion::positive_u32")]
        width: u32,
        #[serde(deserialize_with = "conversion::positive_u32")]
        height: u32,
        #[serde(deserialize_with = "conversion::positive_u32")]
        fps: u32,
    },
    /// Pull the next chunk of frames.
    GetFrames,
    /// Pull the next window of audio.
    GetAudio,
    /// Fetch and render a video. `url` is optional on the wire so a missing
    /// locator can be answered with an error instead of being dropped.
    GetMedia {
        #[serde(default)]
        url: Option<String>,
    },
    /// Abandon the current media and reset the session.
    Stop,
    /// Jump to a position, in seconds.
    Seek {
        #[serde(deserialize_with = "conversion::seconds")]
        time: f64,
    },
}

impl ClientMessage {
    /// The wire discriminator, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Init { .. } => "init",
            ClientMessage::GetFrames => "get_frames",
            ClientMessage::GetAudio => "get_audio",
            ClientMessage::GetMedia { .. } => "get_media",
            ClientMessage::Stop => "stop",
            ClientMessage::Seek { .. } => "seek",
        }
    }
}

/// Why an inbound text frame could not be turned into a [`ClientMessage`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("message is not an object with a string `type`")]
    MissingType,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid `{kind}` message: {source}")]
    InvalidFields {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one text frame.
///
/// Unknown types are reported separately from field errors so callers can
/// log them differently.
pub fn decode(text: &str) -> Result<ClientMessage, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(DecodeError::Json)?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or(DecodeError::MissingType)?
        .to_string();

    if !CLIENT_MESSAGE_TYPES.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidFields { kind, source })
}
