//! Media acquisition and rendering.
//!
//! Sessions never touch video data directly. They call three collaborators:
//!
//! - [`Fetcher`] downloads a source URL into the workspace.
//! - [`Transcoder`] turns the download into numbered frame images and one
//!   DFPWM audio artifact.
//! - [`FrameRenderer`] turns one frame image into the text payload the
//!   client blits to its monitor.
//!
//! The default implementations shell out to `yt-dlp` and `ffmpeg`. Tests
//! substitute in-process fakes.

pub mod ffmpeg;
pub mod palette;
pub mod process;
pub mod ytdlp;

use async_trait::async_trait;
use reelconf::ToolsConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::types::Playback;

pub use ffmpeg::FfmpegTranscoder;
pub use palette::PaletteRenderer;
pub use ytdlp::YtDlpFetcher;

/// Errors from media collaborators. Surfaced to clients as `error` messages.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} produced no {what}")]
    NoOutput { program: String, what: &'static str },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode frame {path}: {reason}")]
    BadFrame { path: PathBuf, reason: String },
}

impl MediaError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        MediaError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Artifacts produced by a [`Transcoder`], all inside the session workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMedia {
    /// Frame images in playback order.
    pub frames: Vec<PathBuf>,
    /// DFPWM audio. May not exist when the source had no audio track.
    pub audio: PathBuf,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest_dir`, returning the path of the video file.
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, MediaError>;
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Scale and resample `source` for `playback`, writing artifacts under `workspace`.
    async fn transcode(
        &self,
        source: &Path,
        playback: Playback,
        workspace: &Path,
    ) -> Result<RenderedMedia, MediaError>;
}

/// Converts one frame image to its wire payload.
///
/// Called from the blocking pool, so implementations may do synchronous I/O.
pub trait FrameRenderer: Send + Sync {
    fn render(&self, frame: &Path) -> Result<String, MediaError>;
}

/// The collaborator set shared by every connection.
#[derive(Clone)]
pub struct MediaTools {
    pub fetcher: Arc<dyn Fetcher>,
    pub transcoder: Arc<dyn Transcoder>,
    pub renderer: Arc<dyn FrameRenderer>,
}

impl MediaTools {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        transcoder: Arc<dyn Transcoder>,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            renderer,
        }
    }

    /// yt-dlp, ffmpeg and the 16-color palette renderer.
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(
            Arc::new(YtDlpFetcher::new(&tools.yt_dlp, &tools.format)),
            Arc::new(FfmpegTranscoder::new(&tools.ffmpeg, tools.audio_sample_rate)),
            Arc::new(PaletteRenderer::default()),
        )
    }
}
