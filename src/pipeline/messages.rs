//! Message types passed between pipeline stages.

use std::time::Instant;

use crate::channel::events::ServerEvent;

/// One assistant reply tied to a single synthesis-and-playback cycle.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    /// Reply text to synthesize and render.
    pub text: String,
    /// Optional avatar motion name attached to the reply.
    pub motion: Option<String>,
    /// When the dispatcher accepted the server event.
    pub received_at: Instant,
}

impl AssistantTurn {
    /// Create a turn timestamped now.
    #[must_use]
    pub fn new(text: String, motion: Option<String>) -> Self {
        Self {
            text,
            motion,
            received_at: Instant::now(),
        }
    }

    /// Identity used to suppress duplicate deliveries within the dedupe
    /// window. Derived from `(motion, text)`; arrival time is excluded.
    #[must_use]
    pub fn dedupe_key(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.motion.as_deref().unwrap_or("").as_bytes());
        hasher.update(&[0]);
        hasher.update(self.text.as_bytes());
        *hasher.finalize().as_bytes()
    }
}

/// Connection state of the server channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No channel; the reconnect loop is (or will be) running.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The channel is up.
    Connected,
}

/// Events consumed by the coordinator task — the single place where session
/// and dispatch state are mutated.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// Transport state change published by the connection task.
    Connection(ConnectionState),
    /// Parsed inbound server event.
    Server(ServerEvent),
    /// User requested to skip the current playback.
    Skip,
    /// A playback session finished (sink ended, or the turn produced no
    /// audio). Stale sequence numbers are ignored by the coordinator.
    PlaybackEnded { seq: u64 },
    /// Stop the coordinator loop.
    Shutdown,
}
