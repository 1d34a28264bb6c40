//! Chunked stream consumer: network body → bounded chunk channel.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::synthesis::AudioStream;

/// Read the audio body until exhaustion or cancellation, forwarding chunks
/// into the bounded channel.
///
/// The token is checked before each read is scheduled and again after it
/// resolves: a read already in flight when cancellation fires is allowed to
/// complete, but its payload is discarded, never forwarded. Dropping the
/// sender on return is the stream-done signal for the buffer controller.
/// A full channel suspends the send, which pushes backpressure all the way
/// to the network read.
pub(crate) async fn consume(
    mut body: AudioStream,
    chunk_tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            debug!("stream consumer stopping before next read");
            return;
        }

        let Some(chunk) = body.next_chunk().await else {
            return;
        };

        if cancel.is_cancelled() {
            debug!(len = chunk.len(), "discarding chunk that resolved after cancellation");
            return;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            sent = chunk_tx.send(chunk) => {
                if sent.is_err() {
                    // Buffer controller is gone; nothing left to feed.
                    return;
                }
            }
        }
    }
}
