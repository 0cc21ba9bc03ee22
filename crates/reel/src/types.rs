//! Domain types shared by sessions, the producer, and media tools.

use reelconf::ReelConfig;
use std::fmt;
use std::path::PathBuf;

/// Terminal geometry and frame rate negotiated by `init`.
///
/// Fixed for the life of a connection; `stop` carries it over to the
/// replacement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl fmt::Display for Playback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}fps", self.width, self.height, self.fps)
    }
}

/// One entry in a session's frame queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameItem {
    /// A rendered frame, ready to send as-is.
    Frame(String),
    /// The producer has rendered every frame source.
    End,
}

/// Settings every session on this server is created with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub frame_chunk_size: usize,
    pub audio_chunk_size: usize,
    /// Frame queue capacity, in frames.
    pub queue_capacity: usize,
    pub workspace_root: PathBuf,
}

impl From<&ReelConfig> for SessionConfig {
    fn from(config: &ReelConfig) -> Self {
        Self {
            frame_chunk_size: config.video.frame_chunk_size,
            audio_chunk_size: config.video.audio_chunk_size,
            queue_capacity: config.frame_queue_capacity(),
            workspace_root: config.infra.paths.workspace_root.clone(),
        }
    }
}
