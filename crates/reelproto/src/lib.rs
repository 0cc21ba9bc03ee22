//! reelproto - wire types for the reel session protocol
//!
//! A client (a CC:Tweaked computer running a Lua player) holds one WebSocket
//! open and exchanges UTF-8 text frames, each a single JSON object with a
//! `type` discriminator.
//!
//! ## Client → server
//!
//! | type         | fields                 |
//! |--------------|------------------------|
//! | `init`       | `width`, `height`, `fps` |
//! | `get_media`  | `url`                  |
//! | `get_frames` |                        |
//! | `get_audio`  |                        |
//! | `stop`       |                        |
//! | `seek`       | `time`                 |
//!
//! ## Server → client
//!
//! `ready`, `frame{data}`, `frames_end`, `audio{data}`, `audio_end`,
//! `error{message}`.
//!
//! Playback is pull-driven: the server never sends frames or audio the
//! client did not ask for.

pub mod client;
pub mod conversion;
pub mod responses;

pub use client::{decode, ClientMessage, DecodeError, CLIENT_MESSAGE_TYPES};
pub use responses::ServerMessage;
