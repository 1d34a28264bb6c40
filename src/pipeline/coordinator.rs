//! The coordinator task: single consumer of the typed inbound event queue
//! and sole mutator of session and dispatch state.
//!
//! Exactly one playback session is active at a time. Starting a new turn
//! cancels the prior session before a single field assignment installs the
//! new handle, so no callback from the old session can write through a
//! reference captured before the swap — stale completions are additionally
//! fenced by sequence numbers.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::channel::connection::{self, SessionStore};
use crate::channel::events::ServerEvent;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::pipeline::dispatch::TurnDeduper;
use crate::pipeline::messages::{AssistantTurn, CoordinatorEvent};
use crate::playback::session::{self, TurnHandle};
use crate::playback::traits::{
    MotionHook, NullReflector, PlaybackBackend, StatusReflector, VisualizerHook,
};
use crate::synthesis::SynthesisClient;

/// External control surface for a running relay.
#[derive(Clone)]
pub struct CoordinatorHandle {
    events_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    cancel: CancellationToken,
}

impl CoordinatorHandle {
    /// Skip the current playback session, if any.
    pub fn skip(&self) {
        let _ = self.events_tx.send(CoordinatorEvent::Skip);
    }

    /// Inject an event as if it arrived on the server channel.
    pub fn inject(&self, event: ServerEvent) {
        let _ = self.events_tx.send(CoordinatorEvent::Server(event));
    }

    /// Shut the relay down, cancelling any active playback and the
    /// connection task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let _ = self.events_tx.send(CoordinatorEvent::Shutdown);
    }
}

/// Orchestrates event intake, dedupe, synthesis, and playback sessions.
pub struct RelayCoordinator {
    config: RelayConfig,
    synthesis: Arc<SynthesisClient>,
    backend: Arc<dyn PlaybackBackend>,
    reflector: Arc<dyn StatusReflector>,
    motion: Option<Arc<dyn MotionHook>>,
    visualizer: Option<Arc<dyn VisualizerHook>>,
    deduper: TurnDeduper,
    session_store: SessionStore,
    active: Option<TurnHandle>,
    seq: u64,
    cancel: CancellationToken,
    events_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    events_rx: mpsc::UnboundedReceiver<CoordinatorEvent>,
}

impl RelayCoordinator {
    /// Create a coordinator. The backend supplies a fresh decoder/sink pair
    /// per assistant turn.
    #[must_use]
    pub fn new(mut config: RelayConfig, backend: Arc<dyn PlaybackBackend>) -> Self {
        // A zero-capacity chunk channel cannot be constructed; embedders that
        // skip `RelayConfig::validate` get the minimum instead of a panic.
        if config.playback.buffer_chunks == 0 {
            config.playback.buffer_chunks = 1;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let synthesis = Arc::new(SynthesisClient::new(&config.synthesis));
        let deduper = TurnDeduper::new(config.dispatch.dedupe_window());

        Self {
            config,
            synthesis,
            backend,
            reflector: Arc::new(NullReflector),
            motion: None,
            visualizer: None,
            deduper,
            session_store: Arc::new(Mutex::new(None)),
            active: None,
            seq: 0,
            cancel: CancellationToken::new(),
            events_tx,
            events_rx,
        }
    }

    /// Attach a UI status reflector.
    #[must_use]
    pub fn with_reflector(mut self, reflector: Arc<dyn StatusReflector>) -> Self {
        self.reflector = reflector;
        self
    }

    /// Attach a best-effort avatar motion hook.
    #[must_use]
    pub fn with_motion_hook(mut self, hook: Arc<dyn MotionHook>) -> Self {
        self.motion = Some(hook);
        self
    }

    /// Attach a best-effort visualizer hook.
    #[must_use]
    pub fn with_visualizer(mut self, hook: Arc<dyn VisualizerHook>) -> Self {
        self.visualizer = Some(hook);
        self
    }

    /// Control handle usable from other tasks.
    #[must_use]
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            events_tx: self.events_tx.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Root cancellation token for embedding in a larger shutdown tree.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Connect the server channel and run until shutdown.
    pub async fn run(mut self) -> Result<()> {
        let connection = connection::spawn(
            self.config.channel.clone(),
            Arc::clone(&self.session_store),
            self.events_tx.clone(),
            self.cancel.clone(),
        );
        let result = self.run_loop().await;
        drop(connection);
        result
    }

    /// Run without a server channel; events arrive via
    /// [`CoordinatorHandle::inject`]. Used by embedders that own their own
    /// transport, and by tests.
    pub async fn run_detached(mut self) -> Result<()> {
        self.run_loop().await
    }

    async fn run_loop(&mut self) -> Result<()> {
        loop {
            let event = tokio::select! {
                () = self.cancel.cancelled() => break,
                event = self.events_rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                CoordinatorEvent::Connection(state) => {
                    debug!(?state, "connection state changed");
                    self.reflector.connection_changed(state);
                }
                CoordinatorEvent::Server(event) => self.handle_server_event(event),
                CoordinatorEvent::Skip => {
                    if let Some(active) = self.active.take() {
                        info!(seq = active.seq(), "skip requested, cancelling playback");
                        active.cancel();
                        self.reflector.status_text("idle");
                    }
                }
                CoordinatorEvent::PlaybackEnded { seq } => self.playback_ended(seq),
                CoordinatorEvent::Shutdown => break,
            }
        }

        if let Some(active) = self.active.take() {
            active.cancel();
        }
        Ok(())
    }

    fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::SessionRegistered { session_id } => {
                info!(%session_id, "session identity registered");
                connection::store_session(&self.session_store, session_id);
            }
            ServerEvent::Subtitle { speaker, text } => {
                if speaker == self.config.channel.counterpart_speaker {
                    self.reflector.message(&speaker, &text);
                }
            }
            ServerEvent::AiStatus { status } => {
                self.reflector.status_text(&status);
            }
            ServerEvent::AiResponse { text, motion } => {
                let turn = AssistantTurn::new(text, motion);
                if !self.deduper.accept(&turn) {
                    debug!("suppressing duplicate assistant turn");
                    return;
                }

                self.reflector.message("ai", &turn.text);
                if let (Some(hook), Some(motion)) = (&self.motion, &turn.motion) {
                    hook.trigger(motion);
                }

                self.start_turn(turn);
            }
        }
    }

    fn start_turn(&mut self, turn: AssistantTurn) {
        // Starting a new session always cancels the prior one first.
        if let Some(prev) = self.active.take() {
            debug!(seq = prev.seq(), "preempting active playback session");
            prev.cancel();
        }

        self.seq += 1;
        let handle = TurnHandle::new(self.seq);

        let ctx = session::TurnContext {
            seq: self.seq,
            turn,
            synthesis: Arc::clone(&self.synthesis),
            backend: Arc::clone(&self.backend),
            reflector: Arc::clone(&self.reflector),
            visualizer: self.visualizer.clone(),
            sink_slot: handle.sink_slot(),
            buffer_chunks: self.config.playback.buffer_chunks,
            cancel: handle.cancel_token(),
            events_tx: self.events_tx.clone(),
        };
        tokio::spawn(session::run_turn(ctx));

        // The single assignment installing the new session.
        self.active = Some(handle);
    }

    fn playback_ended(&mut self, seq: u64) {
        // A late completion from a cancelled session carries a stale seq and
        // must not release the successor's resources.
        let matches = self.active.as_ref().is_some_and(|a| a.seq() == seq);
        if !matches {
            debug!(seq, "ignoring stale playback completion");
            return;
        }

        if let Some(active) = self.active.take() {
            active.cancel(); // releases the sink; idempotent on ended sessions
        }
        self.reflector.status_text("idle");
        debug!(seq, "playback session ended");
    }
}
