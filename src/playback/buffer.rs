//! Single-consumer FIFO gate between the stream consumer and the decoder.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::playback::traits::MediaDecoder;

/// Pull chunks one at a time and append them to the decoder.
///
/// Awaiting each `append` before the next `recv` is the whole flow-control
/// story: appends stay in arrival order and at most one is in flight.
/// Returns once the stream is done (channel closed), the decoder rejects an
/// append, or cancellation fires. Every exit path funnels into the single
/// epilogue below, so the decoder hears "no more data" exactly once — the
/// natural-end path and a delayed final read cannot both signal it.
pub(crate) async fn drive(
    mut decoder: Box<dyn MediaDecoder>,
    mut chunk_rx: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
) {
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            chunk = chunk_rx.recv() => match chunk {
                Some(chunk) => chunk,
                None => break,
            },
        };

        // Tolerated race: a recv can resolve in the same poll as the cancel.
        if cancel.is_cancelled() {
            debug!(len = chunk.len(), "discarding chunk received after cancellation");
            break;
        }

        if let Err(e) = decoder.append(chunk).await {
            // No retry: the session is considered ended and torn down.
            warn!("decoder append failed, ending session: {e}");
            break;
        }
    }

    if decoder.is_open()
        && let Err(e) = decoder.finish().await
    {
        debug!("decoder finish failed: {e}");
    }
}
