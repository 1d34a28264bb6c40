//! Trait seams toward the decoder, the audio sink, and optional UI
//! collaborators.
//!
//! The relay never touches a codec or a sound device directly; everything
//! audible lives behind [`PlaybackBackend`]. Hooks are best-effort: a missing
//! collaborator is skipped, never an error.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::pipeline::messages::ConnectionState;

/// Incremental media decoder fed by the buffer controller.
///
/// One instance lives per playback session. `append` resolves when the
/// decoder has incorporated the chunk; the buffer controller awaits it
/// before pulling the next chunk, which is what keeps appends FIFO with at
/// most one in flight.
#[async_trait]
pub trait MediaDecoder: Send {
    /// Append one chunk of encoded audio.
    async fn append(&mut self, chunk: Bytes) -> Result<()>;

    /// Signal that no more data will arrive. Called at most once per
    /// session, and only while [`is_open`](Self::is_open) is true.
    async fn finish(&mut self) -> Result<()>;

    /// Whether the decoder can still accept `append`/`finish` calls.
    fn is_open(&self) -> bool;
}

/// The audible output channel for decoded audio.
///
/// `stop` releases the sink's resources and must be idempotent: the session
/// may call it after playback has already ended naturally.
pub trait AudioSink: Send + Sync {
    /// Begin (or resume) audible output.
    fn play(&self);

    /// Pause audible output without releasing resources.
    fn pause(&self);

    /// Stop playback and release sink resources.
    fn stop(&self);

    /// Register a callback fired once when playback reaches the natural end
    /// of the decoded audio.
    fn on_ended(&self, callback: Box<dyn FnOnce() + Send>);
}

/// Creates a fresh decoder/sink pair for each assistant turn.
pub trait PlaybackBackend: Send + Sync {
    /// Open a new decoder and sink wired to each other.
    fn open(&self) -> Result<(Box<dyn MediaDecoder>, Arc<dyn AudioSink>)>;
}

/// Thin UI sink for connection and playback status.
pub trait StatusReflector: Send + Sync {
    /// The server channel changed state.
    fn connection_changed(&self, state: ConnectionState);

    /// Short status line ("speaking", "idle", or server-provided text).
    fn status_text(&self, text: &str);

    /// Render a message bubble for the given speaker.
    fn message(&self, speaker: &str, text: &str);
}

/// No-op reflector for embedders without a UI.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReflector;

impl StatusReflector for NullReflector {
    fn connection_changed(&self, _state: ConnectionState) {}
    fn status_text(&self, _text: &str) {}
    fn message(&self, _speaker: &str, _text: &str) {}
}

/// Best-effort avatar motion trigger.
pub trait MotionHook: Send + Sync {
    /// Fire the named motion.
    fn trigger(&self, motion: &str);
}

/// Best-effort audio visualizer, handed the decoder before streaming starts.
pub trait VisualizerHook: Send + Sync {
    /// Attach to the decoder's output.
    fn attach(&self, decoder: &dyn MediaDecoder);
}
