//! Playback session: one decoder/sink pair per assistant turn, torn down by
//! cooperative cancellation.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::pipeline::messages::{AssistantTurn, CoordinatorEvent};
use crate::playback::traits::{
    AudioSink, MediaDecoder, PlaybackBackend, StatusReflector, VisualizerHook,
};
use crate::playback::{buffer, stream};
use crate::synthesis::{AudioStream, SynthesisClient};

/// Take-once slot for the session's sink, shared between the handle and the
/// turn task. Whichever side takes the sink is the one that stops it.
pub(crate) type SinkSlot = Arc<Mutex<Option<Arc<dyn AudioSink>>>>;

fn take_sink(slot: &SinkSlot) -> Option<Arc<dyn AudioSink>> {
    match slot.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

fn install_sink(slot: &SinkSlot, sink: Arc<dyn AudioSink>) {
    match slot.lock() {
        Ok(mut slot) => *slot = Some(sink),
        Err(poisoned) => *poisoned.into_inner() = Some(sink),
    }
}

/// Handle to the active playback session, held by the coordinator.
///
/// Cancellation is cooperative: the token is observed by the stream consumer
/// and buffer controller at their suspension points; work already in flight
/// finishes but its result is discarded.
pub struct TurnHandle {
    seq: u64,
    cancel: CancellationToken,
    sink: SinkSlot,
}

impl TurnHandle {
    pub(crate) fn new(seq: u64) -> Self {
        Self {
            seq,
            cancel: CancellationToken::new(),
            sink: Arc::new(Mutex::new(None)),
        }
    }

    /// Sequence number distinguishing this session from its predecessors.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Cancel the session: no further chunk forwarding, decoder appends, or
    /// sink writes happen after the suspension points observe the token, and
    /// the sink is stopped and released. Idempotent, and safe to call on a
    /// session that already ended naturally.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if let Some(sink) = take_sink(&self.sink) {
            sink.stop();
        }
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn sink_slot(&self) -> SinkSlot {
        Arc::clone(&self.sink)
    }
}

/// Everything a spawned turn task needs, bundled by the coordinator.
pub(crate) struct TurnContext {
    pub seq: u64,
    pub turn: AssistantTurn,
    pub synthesis: Arc<SynthesisClient>,
    pub backend: Arc<dyn PlaybackBackend>,
    pub reflector: Arc<dyn StatusReflector>,
    pub visualizer: Option<Arc<dyn VisualizerHook>>,
    pub sink_slot: SinkSlot,
    pub buffer_chunks: usize,
    pub cancel: CancellationToken,
    pub events_tx: mpsc::UnboundedSender<CoordinatorEvent>,
}

/// Drive one assistant turn: synthesize, then stream the audio through the
/// buffer controller into a fresh decoder/sink pair.
///
/// Every degraded outcome (timeout, non-audio response, backend failure)
/// reports `PlaybackEnded` so the coordinator can release the handle; none
/// of them is fatal to the host.
pub(crate) async fn run_turn(ctx: TurnContext) {
    ctx.reflector.status_text("speaking");

    let body = match ctx.synthesis.synthesize(&ctx.turn.text, &ctx.cancel).await {
        Ok(Some(body)) => body,
        Ok(None) => {
            debug!(seq = ctx.seq, "no playable synthesis output for turn");
            finish_without_audio(&ctx);
            return;
        }
        Err(e) => {
            warn!(seq = ctx.seq, "synthesis failed: {e}");
            finish_without_audio(&ctx);
            return;
        }
    };

    // The response may have raced a Skip or a newer turn.
    if ctx.cancel.is_cancelled() {
        debug!(seq = ctx.seq, "turn cancelled before playback start");
        return;
    }

    let (decoder, sink) = match ctx.backend.open() {
        Ok(pair) => pair,
        Err(e) => {
            warn!(seq = ctx.seq, "playback backend failed to open: {e}");
            finish_without_audio(&ctx);
            return;
        }
    };

    run_playback(&ctx, body, decoder, sink).await;
}

fn finish_without_audio(ctx: &TurnContext) {
    ctx.reflector.status_text("idle");
    let _ = ctx.events_tx.send(CoordinatorEvent::PlaybackEnded { seq: ctx.seq });
}

async fn run_playback(
    ctx: &TurnContext,
    body: AudioStream,
    decoder: Box<dyn MediaDecoder>,
    sink: Arc<dyn AudioSink>,
) {
    if let Some(visualizer) = &ctx.visualizer {
        visualizer.attach(decoder.as_ref());
    }

    install_sink(&ctx.sink_slot, Arc::clone(&sink));

    let events_tx = ctx.events_tx.clone();
    let seq = ctx.seq;
    sink.on_ended(Box::new(move || {
        let _ = events_tx.send(CoordinatorEvent::PlaybackEnded { seq });
    }));

    // Start audibly before the first byte lands.
    sink.play();

    let (chunk_tx, chunk_rx) = mpsc::channel(ctx.buffer_chunks);
    let consumer = tokio::spawn(stream::consume(body, chunk_tx, ctx.cancel.clone()));
    buffer::drive(decoder, chunk_rx, ctx.cancel.clone()).await;
    let _ = consumer.await;

    if ctx.cancel.is_cancelled() {
        // Cancelled teardown: stop the sink unless the handle already took it.
        if let Some(sink) = take_sink(&ctx.sink_slot) {
            sink.stop();
        }
        debug!(seq = ctx.seq, "playback session cancelled");
    } else {
        // Natural end: the sink drains the remaining decoded audio and fires
        // on_ended; the coordinator releases the handle then.
        debug!(seq = ctx.seq, "stream complete, sink draining");
    }
}
