//! Voxrelay: realtime spoken-response delivery for conversational clients.
//!
//! The crate receives assistant-turn events from a conversation server over
//! a persistent WebSocket channel, requests speech synthesis for each turn
//! over HTTP, and plays the audio incrementally as it downloads:
//!
//! Server events → dedupe → synthesis → chunked download → decoder → sink
//!
//! # Architecture
//!
//! Independent tasks connected by async channels:
//! - **Connection**: owns the WebSocket lifecycle, fixed-interval reconnect,
//!   and session-identity registration
//! - **Coordinator**: single consumer of the typed inbound event queue and
//!   sole mutator of session and dispatch state
//! - **Stream consumer**: reads the synthesis response body chunk by chunk
//! - **Buffer controller**: single-consumer FIFO gate in front of the
//!   decoder, providing backpressure and strict append ordering
//!
//! Decoding and audible output are external collaborators behind the
//! [`PlaybackBackend`] seam; the crate only orchestrates network-to-playback
//! flow control and cancellation.
//!
//! Cancellation is cooperative via [`tokio_util::sync::CancellationToken`]:
//! reads and appends already in flight when a session is cancelled are
//! allowed to finish, but their results are discarded.

pub mod channel;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod playback;
pub mod synthesis;

pub use channel::connection::{ConnectionHandle, SessionStore};
pub use channel::events::{ClientEvent, ServerEvent};
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use pipeline::coordinator::{CoordinatorHandle, RelayCoordinator};
pub use pipeline::messages::{AssistantTurn, ConnectionState};
pub use playback::traits::{
    AudioSink, MediaDecoder, MotionHook, NullReflector, PlaybackBackend, StatusReflector,
    VisualizerHook,
};
pub use synthesis::{AudioStream, SynthesisClient};
