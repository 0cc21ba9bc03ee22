//! In-process stand-ins for yt-dlp and ffmpeg.

#![allow(dead_code)]

use async_trait::async_trait;
use reel::dispatch::Dispatcher;
use reel::media::ffmpeg::{list_frames, AUDIO_FILE, FRAMES_DIR};
use reel::media::{
    Fetcher, FrameRenderer, MediaError, MediaTools, PaletteRenderer, RenderedMedia, Transcoder,
};
use reel::types::{Playback, SessionConfig};
use reelproto::ServerMessage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes a placeholder video, or fails for URLs containing "missing".
pub struct FakeFetcher;

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, MediaError> {
        if url.contains("missing") {
            return Err(MediaError::ToolFailed {
                program: "yt-dlp".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "ERROR: Video unavailable".to_string(),
            });
        }
        std::fs::create_dir_all(dest_dir).map_err(|e| io_error(dest_dir, e))?;
        let path = dest_dir.join("video.mp4");
        std::fs::write(&path, url).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }
}

/// Writes `frames` solid-color PPM frames and `audio` as the audio artifact.
///
/// Frame `i` uses palette slot `i % 16`, so its rendered rows are that hex
/// digit repeated.
pub struct FakeTranscoder {
    pub frames: usize,
    pub audio: Vec<u8>,
    pub fail: bool,
}

impl FakeTranscoder {
    pub fn new(frames: usize, audio: Vec<u8>) -> Self {
        Self {
            frames,
            audio,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            frames: 0,
            audio: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        _source: &Path,
        playback: Playback,
        workspace: &Path,
    ) -> Result<RenderedMedia, MediaError> {
        if self.fail {
            return Err(MediaError::NoOutput {
                program: "ffmpeg".to_string(),
                what: "frames",
            });
        }

        let frames_dir = workspace.join(FRAMES_DIR);
        std::fs::create_dir_all(&frames_dir).map_err(|e| io_error(&frames_dir, e))?;
        for i in 0..self.frames {
            let path = frames_dir.join(format!("out_{:05}.ppm", i + 1));
            let color = reel::media::palette::CC_PALETTE[i % 16];
            std::fs::write(&path, solid_ppm(playback, color)).map_err(|e| io_error(&path, e))?;
        }

        let audio = workspace.join(AUDIO_FILE);
        std::fs::write(&audio, &self.audio).map_err(|e| io_error(&audio, e))?;

        Ok(RenderedMedia {
            frames: list_frames(&frames_dir)?,
            audio,
        })
    }
}

/// Fails on the frame with the given 1-based number.
pub struct FailingRenderer {
    pub fail_on: usize,
    inner: PaletteRenderer,
}

impl FailingRenderer {
    pub fn new(fail_on: usize) -> Self {
        Self {
            fail_on,
            inner: PaletteRenderer::default(),
        }
    }
}

impl FrameRenderer for FailingRenderer {
    fn render(&self, frame: &Path) -> Result<String, MediaError> {
        let target = format!("out_{:05}.ppm", self.fail_on);
        if frame.file_name() == Some(std::ffi::OsStr::new(&target)) {
            return Err(MediaError::BadFrame {
                path: frame.to_path_buf(),
                reason: "corrupt".to_string(),
            });
        }
        self.inner.render(frame)
    }
}

pub fn solid_ppm(playback: Playback, color: [u8; 3]) -> Vec<u8> {
    let mut bytes = format!("P6\n{} {}\n255\n", playback.width, playback.height).into_bytes();
    for _ in 0..playback.width * playback.height {
        bytes.extend_from_slice(&color);
    }
    bytes
}

/// The payload [`PaletteRenderer`] produces for frame `index` (0-based).
pub fn expected_frame(playback: Playback, index: usize) -> String {
    let digit = std::char::from_digit((index % 16) as u32, 16).unwrap();
    let row: String = std::iter::repeat(digit).take(playback.width as usize).collect();
    vec![row; playback.height as usize].join("\n")
}

pub fn session_config(root: &Path) -> Arc<SessionConfig> {
    Arc::new(SessionConfig {
        frame_chunk_size: 5,
        audio_chunk_size: 1024,
        queue_capacity: 15,
        workspace_root: root.to_path_buf(),
    })
}

pub fn dispatcher(root: &Path, transcoder: FakeTranscoder) -> Dispatcher {
    dispatcher_with_renderer(root, transcoder, Arc::new(PaletteRenderer::default()))
}

pub fn dispatcher_with_renderer(
    root: &Path,
    transcoder: FakeTranscoder,
    renderer: Arc<dyn FrameRenderer>,
) -> Dispatcher {
    let tools = MediaTools::new(Arc::new(FakeFetcher), Arc::new(transcoder), renderer);
    Dispatcher::new(session_config(root), tools)
}

/// Send each JSON line through the dispatcher and collect every reply.
pub async fn run(dispatcher: &mut Dispatcher, messages: &[&str]) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    for message in messages {
        dispatcher
            .handle_text(message, &mut out)
            .await
            .expect("dispatch failed");
    }
    out
}

pub const INIT: &str = r#"{"type":"init","width":4,"height":2,"fps":5}"#;
pub const PLAYBACK: Playback = Playback {
    width: 4,
    height: 2,
    fps: 5,
};

fn io_error(path: &Path, source: std::io::Error) -> MediaError {
    MediaError::Io {
        path: path.to_path_buf(),
        source,
    }
}
