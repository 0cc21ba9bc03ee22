//! Per-connection playback sessions.
//!
//! A [`Session`] owns everything one client is playing: the negotiated
//! [`Playback`] geometry, a private [`Workspace`] directory, and once media is
//! loaded, the frame queue, its [`FrameProducer`], and an [`AudioCursor`].
//!
//! ## Lifecycle
//!
//! ```text
//! init       → Session::create      (empty workspace, no media)
//!      ↓
//! get_media  → Session::attach_media (producer starts filling the queue)
//!      ↓
//! get_frames / get_audio            (pull chunks at the client's pace)
//!      ↓
//! stop       → Session::reset       (producer cancelled, workspace replaced)
//! ```
//!
//! Sessions are never shared. The connection task holds one by value and
//! passes it `&mut` to each handler, so no locking is involved.

pub mod audio;
pub mod producer;
pub mod workspace;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::media::{FrameRenderer, RenderedMedia};
use crate::types::{FrameItem, Playback, SessionConfig};

pub use audio::AudioCursor;
pub use producer::{FrameProducer, ProducerOutcome};
pub use workspace::Workspace;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create workspace under {root}: {source}")]
    Workspace {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read audio artifact {path}: {source}")]
    Audio {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("media already loaded")]
    MediaAlreadyLoaded,
}

/// One `get_frames` worth of queue items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameChunk {
    pub frames: Vec<String>,
    /// The end of the stream was reached while filling this chunk.
    pub ended: bool,
}

/// Result of one audio read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioWindow {
    Data(Vec<u8>),
    End,
}

/// Playback state present only after `get_media` succeeds.
#[derive(Debug)]
struct LoadedMedia {
    frame_count: usize,
    frames_rx: mpsc::Receiver<FrameItem>,
    producer: FrameProducer,
    audio: AudioCursor,
}

#[derive(Debug)]
pub struct Session {
    playback: Playback,
    config: Arc<SessionConfig>,
    workspace: Workspace,
    media: Option<LoadedMedia>,
}

impl Session {
    /// Allocate a workspace and build a session with no media.
    pub fn create(playback: Playback, config: Arc<SessionConfig>) -> Result<Self, SessionError> {
        let workspace =
            Workspace::create(&config.workspace_root).map_err(|source| SessionError::Workspace {
                root: config.workspace_root.clone(),
                source,
            })?;

        info!(%playback, workspace = %workspace.path().display(), "Session created");
        Ok(Self {
            playback,
            config,
            workspace,
            media: None,
        })
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }

    /// Number of frame sources the producer was started with.
    pub fn frame_count(&self) -> usize {
        self.media.as_ref().map_or(0, |m| m.frame_count)
    }

    /// Items currently buffered in the frame queue.
    pub fn queued_frames(&self) -> usize {
        self.media.as_ref().map_or(0, |m| m.frames_rx.len())
    }

    pub fn audio_offset(&self) -> u64 {
        self.media.as_ref().map_or(0, |m| m.audio.offset())
    }

    pub fn producer_running(&self) -> bool {
        self.media
            .as_ref()
            .is_some_and(|m| !m.producer.is_finished())
    }

    /// Install transcoded media and start the frame producer.
    ///
    /// A session takes media once; `stop` is the way to load another.
    pub fn attach_media(
        &mut self,
        media: RenderedMedia,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Result<(), SessionError> {
        if self.media.is_some() {
            return Err(SessionError::MediaAlreadyLoaded);
        }

        let frame_count = media.frames.len();
        let (tx, frames_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let producer = FrameProducer::spawn(media.frames, renderer, tx);
        let audio = AudioCursor::new(media.audio, self.config.audio_chunk_size);

        info!(
            frames = frame_count,
            queue_capacity = self.config.queue_capacity,
            "Media attached, producer started"
        );
        self.media = Some(LoadedMedia {
            frame_count,
            frames_rx,
            producer,
            audio,
        });
        Ok(())
    }

    /// Pull up to `frame_chunk_size` frames, waiting on the producer as needed.
    ///
    /// Returns `None` when no media is loaded. A closed queue counts as the
    /// end of the stream, so a producer that stopped early never leaves the
    /// caller waiting forever. A producer stalled inside a render does.
    pub async fn next_frame_chunk(&mut self) -> Option<FrameChunk> {
        let chunk_size = self.config.frame_chunk_size;
        let media = self.media.as_mut()?;

        let mut frames = Vec::with_capacity(chunk_size);
        let mut ended = false;
        while frames.len() < chunk_size {
            match media.frames_rx.recv().await {
                Some(FrameItem::Frame(frame)) => frames.push(frame),
                Some(FrameItem::End) | None => {
                    ended = true;
                    break;
                }
            }
        }

        debug!(frames = frames.len(), ended, "Frame chunk ready");
        Some(FrameChunk { frames, ended })
    }

    /// Read the next audio window. Returns `Ok(None)` when no media is loaded.
    pub async fn next_audio_window(&mut self) -> Result<Option<AudioWindow>, SessionError> {
        let Some(media) = self.media.as_mut() else {
            return Ok(None);
        };

        let window = media
            .audio
            .next_window()
            .await
            .map_err(|source| SessionError::Audio {
                path: media.audio.path().to_path_buf(),
                source,
            })?;

        Ok(Some(match window {
            Some(bytes) => AudioWindow::Data(bytes),
            None => AudioWindow::End,
        }))
    }

    /// Retire this session and build its replacement with the same playback
    /// and configuration: new workspace, no media, audio back at offset 0.
    pub async fn reset(self) -> Result<Session, SessionError> {
        let playback = self.playback;
        let config = Arc::clone(&self.config);
        self.close().await;
        Session::create(playback, config)
    }

    /// Cancel the producer, wait for it, and delete the workspace.
    pub async fn close(self) {
        let Session {
            workspace, media, ..
        } = self;

        if let Some(LoadedMedia {
            frames_rx,
            producer,
            ..
        }) = media
        {
            let outcome = producer.cancel().await;
            debug!(?outcome, "Frame producer settled");
            drop(frames_rx);
        }

        workspace.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaError;
    use std::path::Path;

    struct NameRenderer;

    impl FrameRenderer for NameRenderer {
        fn render(&self, frame: &Path) -> Result<String, MediaError> {
            Ok(frame.file_name().unwrap().to_string_lossy().into_owned())
        }
    }

    fn config(root: &Path) -> Arc<SessionConfig> {
        Arc::new(SessionConfig {
            frame_chunk_size: 5,
            audio_chunk_size: 4,
            queue_capacity: 15,
            workspace_root: root.to_path_buf(),
        })
    }

    fn playback() -> Playback {
        Playback {
            width: 40,
            height: 20,
            fps: 5,
        }
    }

    fn media(session: &Session, frames: usize, audio: &[u8]) -> RenderedMedia {
        let audio_path = session.workspace().path().join("audio.dfpwm");
        std::fs::write(&audio_path, audio).unwrap();
        RenderedMedia {
            frames: (0..frames)
                .map(|i| PathBuf::from(format!("out_{:05}.ppm", i + 1)))
                .collect(),
            audio: audio_path,
        }
    }

    #[tokio::test]
    async fn test_new_session_has_no_media() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::create(playback(), config(root.path())).unwrap();

        assert!(!session.has_media());
        assert_eq!(session.queued_frames(), 0);
        assert!(session.next_frame_chunk().await.is_none());
        assert!(session.next_audio_window().await.unwrap().is_none());
        assert!(session.workspace().path().is_dir());
    }

    #[tokio::test]
    async fn test_twelve_frames_chunk_as_five_five_two() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::create(playback(), config(root.path())).unwrap();
        let rendered = media(&session, 12, b"");
        session.attach_media(rendered, Arc::new(NameRenderer)).unwrap();
        assert_eq!(session.frame_count(), 12);

        let first = session.next_frame_chunk().await.unwrap();
        assert_eq!(first.frames.len(), 5);
        assert_eq!(first.frames[0], "out_00001.ppm");
        assert!(!first.ended);

        let second = session.next_frame_chunk().await.unwrap();
        assert_eq!(second.frames.len(), 5);
        assert_eq!(second.frames[0], "out_00006.ppm");
        assert!(!second.ended);

        let third = session.next_frame_chunk().await.unwrap();
        assert_eq!(
            third.frames,
            vec!["out_00011.ppm".to_string(), "out_00012.ppm".to_string()]
        );
        assert!(third.ended);

        // After the end the queue is closed; further pulls end immediately
        let after = session.next_frame_chunk().await.unwrap();
        assert!(after.frames.is_empty());
        assert!(after.ended);
    }

    #[tokio::test]
    async fn test_attach_twice_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::create(playback(), config(root.path())).unwrap();
        let first = media(&session, 1, b"");
        let second = first.clone();

        session.attach_media(first, Arc::new(NameRenderer)).unwrap();
        let err = session
            .attach_media(second, Arc::new(NameRenderer))
            .unwrap_err();
        assert!(matches!(err, SessionError::MediaAlreadyLoaded));
    }

    #[tokio::test]
    async fn test_audio_windows_then_idempotent_end() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::create(playback(), config(root.path())).unwrap();
        let rendered = media(&session, 0, &[1, 2, 3, 4, 5, 6]);
        session.attach_media(rendered, Arc::new(NameRenderer)).unwrap();

        assert_eq!(
            session.next_audio_window().await.unwrap(),
            Some(AudioWindow::Data(vec![1, 2, 3, 4]))
        );
        assert_eq!(
            session.next_audio_window().await.unwrap(),
            Some(AudioWindow::Data(vec![5, 6]))
        );
        for _ in 0..2 {
            assert_eq!(
                session.next_audio_window().await.unwrap(),
                Some(AudioWindow::End)
            );
            assert_eq!(session.audio_offset(), 6);
        }
    }

    #[tokio::test]
    async fn test_reset_replaces_workspace_and_state() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::create(playback(), config(root.path())).unwrap();
        let rendered = media(&session, 200, &[9; 10]);
        session.attach_media(rendered, Arc::new(NameRenderer)).unwrap();
        session.next_frame_chunk().await.unwrap();
        session.next_audio_window().await.unwrap();
        assert_eq!(session.audio_offset(), 4);

        let old_workspace = session.workspace().path().to_path_buf();
        let session = session.reset().await.unwrap();

        assert!(!old_workspace.exists());
        assert_ne!(session.workspace().path(), old_workspace);
        assert!(session.workspace().path().is_dir());
        assert_eq!(session.playback(), playback());
        assert!(!session.has_media());
        assert_eq!(session.queued_frames(), 0);
        assert_eq!(session.audio_offset(), 0);
        assert!(!session.producer_running());
    }

    #[tokio::test]
    async fn test_close_removes_workspace() {
        let root = tempfile::tempdir().unwrap();
        let session = Session::create(playback(), config(root.path())).unwrap();
        let path = session.workspace().path().to_path_buf();
        session.close().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unusable_workspace_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();

        let err = Session::create(playback(), config(&file)).unwrap_err();
        assert!(matches!(err, SessionError::Workspace { .. }));
    }
}
