//! Speech request issuer: one bounded, cancellable HTTP synthesis call per
//! assistant turn.

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SynthesisConfig;
use crate::error::{RelayError, Result};

/// An open audio response body, consumed chunk by chunk.
pub struct AudioStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream").finish_non_exhaustive()
    }
}

impl AudioStream {
    /// Build a stream from in-memory chunks. Used by tests and by local
    /// backends that bypass the synthesis service.
    #[must_use]
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Self {
            inner: futures_util::stream::iter(chunks.into_iter().map(Ok::<_, reqwest::Error>))
                .boxed(),
        }
    }

    /// Next chunk, or `None` when the stream is exhausted.
    ///
    /// A transport error ends the stream early: it is logged and mapped to
    /// exhaustion, so a broken download degrades to a truncated clip rather
    /// than a surfaced failure.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        match self.inner.next().await {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(e)) => {
                warn!("audio stream read failed: {e}");
                None
            }
            None => None,
        }
    }
}

/// Issues synthesis requests for assistant turns.
pub struct SynthesisClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl SynthesisClient {
    /// Create a client for the configured synthesis endpoint.
    #[must_use]
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.url.clone(),
            timeout: config.timeout(),
        }
    }

    /// Issue one synthesis call for the turn text.
    ///
    /// Returns `Ok(None)` — no playback for this turn, not an error — when
    /// the deadline expires, the token is cancelled, the response has an
    /// empty-content status, the content type is not audio, or the body is
    /// declared empty. Dropping out of the call aborts the request.
    pub async fn synthesize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AudioStream>> {
        let request = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "text": text }));

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("synthesis cancelled before response headers");
                return Ok(None);
            }
            outcome = tokio::time::timeout(self.timeout, request.send()) => match outcome {
                Err(_) => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "synthesis request timed out");
                    return Ok(None);
                }
                Ok(Err(e)) => {
                    return Err(RelayError::Synthesis(format!("request failed: {e}")));
                }
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            debug!("synthesis returned no content");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RelayError::Synthesis(format!(
                "synthesis service returned {status}"
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with("audio/") {
            debug!(content_type, "synthesis response is not audio, skipping playback");
            return Ok(None);
        }

        if response.content_length() == Some(0) {
            debug!("synthesis response body is empty, skipping playback");
            return Ok(None);
        }

        Ok(Some(AudioStream {
            inner: response.bytes_stream().boxed(),
        }))
    }
}
