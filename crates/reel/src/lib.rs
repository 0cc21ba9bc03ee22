//! reel - pull-paced video streaming for CC:Tweaked terminals
//!
//! A client opens a WebSocket, sends `init` with its monitor size, asks for a
//! video with `get_media`, then pulls frames and audio in chunks. Each
//! connection owns an isolated [`sessions::Session`]; a background
//! [`sessions::FrameProducer`] renders frames into a bounded queue so the
//! server never runs ahead of the client by more than a few chunks.

pub mod dispatch;
pub mod media;
pub mod sessions;
pub mod telemetry;
pub mod types;
pub mod web;
