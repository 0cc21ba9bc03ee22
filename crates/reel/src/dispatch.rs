//! Routes decoded client messages to session operations.
//!
//! One [`Dispatcher`] per connection. It owns the connection's optional
//! [`Session`] and handles one message at a time to completion, including any
//! wait on the frame queue, so the session never needs a lock.
//!
//! A repeated `init` closes the previous session, deleting its workspace,
//! so a connection never holds more than one workspace or producer.
//!
//! Error handling follows the message's fault:
//!
//! - Undecodable or unknown messages are logged and dropped.
//! - Messages that need a session (or loaded media) when there is none are
//!   logged and dropped without a reply.
//! - Download and conversion failures become `error` replies; the session
//!   stays usable.
//! - Anything else (workspace I/O, audio reads, a dead socket) is returned
//!   as a [`DispatchError`] and ends the connection.

use async_trait::async_trait;
use reelproto::{ClientMessage, ServerMessage};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::media::MediaTools;
use crate::sessions::{AudioWindow, Session, SessionError};
use crate::types::{Playback, SessionConfig};

pub const MISSING_URL: &str = "Missing url in get_media request";
pub const MEDIA_ALREADY_LOADED: &str = "Media already loaded, send stop first";
pub const SEEK_UNSUPPORTED: &str = "Seek is not supported";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection closed: {0}")]
    Closed(String),
}

/// Where replies go. The WebSocket sink in production, a `Vec` in tests.
#[async_trait]
pub trait Outbox: Send {
    async fn send(&mut self, message: ServerMessage) -> Result<(), DispatchError>;
}

#[async_trait]
impl Outbox for Vec<ServerMessage> {
    async fn send(&mut self, message: ServerMessage) -> Result<(), DispatchError> {
        self.push(message);
        Ok(())
    }
}

pub struct Dispatcher {
    config: Arc<SessionConfig>,
    tools: MediaTools,
    session: Option<Session>,
}

impl Dispatcher {
    pub fn new(config: Arc<SessionConfig>, tools: MediaTools) -> Self {
        Self {
            config,
            tools,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Decode one text frame and dispatch it. Malformed frames are dropped.
    pub async fn handle_text<O: Outbox>(
        &mut self,
        text: &str,
        out: &mut O,
    ) -> Result<(), DispatchError> {
        match reelproto::decode(text) {
            Ok(message) => self.dispatch(message, out).await,
            Err(e) => {
                warn!(error = %e, "Dropping malformed message");
                Ok(())
            }
        }
    }

    pub async fn dispatch<O: Outbox>(
        &mut self,
        message: ClientMessage,
        out: &mut O,
    ) -> Result<(), DispatchError> {
        debug!(kind = message.kind(), "Dispatching message");
        match message {
            ClientMessage::Init { width, height, fps } => {
                self.init(Playback { width, height, fps }).await
            }
            ClientMessage::GetMedia { url } => self.get_media(url, out).await,
            ClientMessage::GetFrames => self.get_frames(out).await,
            ClientMessage::GetAudio => self.get_audio(out).await,
            ClientMessage::Stop => self.stop().await,
            ClientMessage::Seek { time } => self.seek(time, out).await,
        }
    }

    /// Tear down the session, if any. Called once when the connection ends.
    pub async fn close(mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }

    async fn init(&mut self, playback: Playback) -> Result<(), DispatchError> {
        if let Some(previous) = self.session.take() {
            info!("Re-init, retiring previous session");
            previous.close().await;
        }
        self.session = Some(Session::create(playback, Arc::clone(&self.config))?);
        Ok(())
    }

    async fn get_media<O: Outbox>(
        &mut self,
        url: Option<String>,
        out: &mut O,
    ) -> Result<(), DispatchError> {
        let Some(session) = self.session.as_mut() else {
            warn!("get_media before init, ignoring");
            return Ok(());
        };

        let url = match url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return out.send(ServerMessage::error(MISSING_URL)).await,
        };

        if session.has_media() {
            warn!(%url, "get_media with media already loaded");
            return out.send(ServerMessage::error(MEDIA_ALREADY_LOADED)).await;
        }

        info!(%url, "Fetching media");
        let source = match self
            .tools
            .fetcher
            .fetch(&url, &session.workspace().media_dir())
            .await
        {
            Ok(source) => source,
            Err(e) => {
                warn!(%url, error = %e, "Download failed");
                return out
                    .send(ServerMessage::error(format!("Download failed: {}", e)))
                    .await;
            }
        };

        let rendered = match self
            .tools
            .transcoder
            .transcode(&source, session.playback(), session.workspace().path())
            .await
        {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(%url, error = %e, "Conversion failed");
                return out
                    .send(ServerMessage::error(format!("Conversion failed: {}", e)))
                    .await;
            }
        };

        session.attach_media(rendered, Arc::clone(&self.tools.renderer))?;
        out.send(ServerMessage::Ready).await
    }

    async fn get_frames<O: Outbox>(&mut self, out: &mut O) -> Result<(), DispatchError> {
        let Some(session) = self.session.as_mut() else {
            warn!("get_frames before init, ignoring");
            return Ok(());
        };
        let Some(chunk) = session.next_frame_chunk().await else {
            warn!("get_frames before media is ready, ignoring");
            return Ok(());
        };

        if chunk.ended {
            out.send(ServerMessage::FramesEnd).await?;
        }
        out.send(ServerMessage::Frame { data: chunk.frames }).await
    }

    async fn get_audio<O: Outbox>(&mut self, out: &mut O) -> Result<(), DispatchError> {
        let Some(session) = self.session.as_mut() else {
            warn!("get_audio before init, ignoring");
            return Ok(());
        };

        match session.next_audio_window().await? {
            Some(AudioWindow::Data(bytes)) => out.send(ServerMessage::audio(&bytes)).await,
            Some(AudioWindow::End) => out.send(ServerMessage::AudioEnd).await,
            None => {
                warn!("get_audio before media is ready, ignoring");
                Ok(())
            }
        }
    }

    async fn stop(&mut self) -> Result<(), DispatchError> {
        let Some(session) = self.session.take() else {
            warn!("stop before init, ignoring");
            return Ok(());
        };
        self.session = Some(session.reset().await?);
        info!("Session reset");
        Ok(())
    }

    async fn seek<O: Outbox>(&mut self, time: f64, out: &mut O) -> Result<(), DispatchError> {
        if self.session.is_none() {
            warn!(time, "seek before init, ignoring");
            return Ok(());
        }
        warn!(time, "Rejecting seek");
        out.send(ServerMessage::error(SEEK_UNSUPPORTED)).await
    }
}
