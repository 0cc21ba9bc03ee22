//! Playback configuration - chunk sizes handed to every session.

use serde::{Deserialize, Serialize};

/// Per-request chunking for frame and audio delivery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoConfig {
    /// Maximum frames per `frame` response.
    #[serde(default = "VideoConfig::default_frame_chunk_size")]
    pub frame_chunk_size: usize,

    /// Maximum audio bytes per `audio` response.
    #[serde(default = "VideoConfig::default_audio_chunk_size")]
    pub audio_chunk_size: usize,
}

impl VideoConfig {
    fn default_frame_chunk_size() -> usize {
        5
    }

    fn default_audio_chunk_size() -> usize {
        1024
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_chunk_size: Self::default_frame_chunk_size(),
            audio_chunk_size: Self::default_audio_chunk_size(),
        }
    }
}
