//! Frame extraction and DFPWM audio through ffmpeg.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::process::run_tool;
use super::{MediaError, RenderedMedia, Transcoder};
use crate::types::Playback;

pub const FRAMES_DIR: &str = "frames";
pub const AUDIO_FILE: &str = "audio.dfpwm";
const FRAME_EXTENSION: &str = "ppm";

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    sample_rate: u32,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            program: program.into(),
            sample_rate,
        }
    }

    fn frame_args(&self, source: &Path, playback: Playback, frames_dir: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            source.display().to_string(),
            "-an".to_string(),
            "-vf".to_string(),
            format!(
                "scale={}:{}:flags=lanczos,fps={}",
                playback.width, playback.height, playback.fps
            ),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            frames_dir
                .join(format!("out_%05d.{}", FRAME_EXTENSION))
                .display()
                .to_string(),
        ]
    }

    // DFPWM is mono only
    fn audio_args(&self, source: &Path, audio: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            source.display().to_string(),
            "-vn".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-c:a".to_string(),
            "dfpwm".to_string(),
            "-f".to_string(),
            "dfpwm".to_string(),
            audio.display().to_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        playback: Playback,
        workspace: &Path,
    ) -> Result<RenderedMedia, MediaError> {
        let frames_dir = workspace.join(FRAMES_DIR);
        tokio::fs::create_dir_all(&frames_dir)
            .await
            .map_err(|e| MediaError::io(&frames_dir, e))?;

        run_tool(&self.program, self.frame_args(source, playback, &frames_dir)).await?;

        let dir = frames_dir.clone();
        let frames = tokio::task::spawn_blocking(move || list_frames(&dir))
            .await
            .map_err(|e| MediaError::io(&frames_dir, std::io::Error::other(e)))??;

        let audio = workspace.join(AUDIO_FILE);
        // A source without an audio track still plays; the audio cursor
        // treats a missing artifact as an empty stream.
        if let Err(e) = run_tool(&self.program, self.audio_args(source, &audio)).await {
            warn!(error = %e, "Audio transcode failed, continuing without audio");
        }

        info!(frames = frames.len(), %playback, "Transcode complete");
        Ok(RenderedMedia { frames, audio })
    }
}

/// Frame images in `dir`, sorted by file name.
///
/// ffmpeg numbers frames with zero padding, so name order is playback order.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, MediaError> {
    let mut frames = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            MediaError::Io {
                path,
                source: e.into(),
            }
        })?;
        let is_frame = entry.file_type().is_file()
            && entry.path().extension().and_then(|ext| ext.to_str()) == Some(FRAME_EXTENSION);
        if is_frame {
            frames.push(entry.into_path());
        }
    }
    Ok(frames)
}
