//! Configuration types for the delivery pipeline.

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Server channel settings.
    pub channel: ChannelConfig,
    /// Speech synthesis settings.
    pub synthesis: SynthesisConfig,
    /// Playback buffering settings.
    pub playback: PlaybackConfig,
    /// Inbound event dispatch settings.
    pub dispatch: DispatchConfig,
}

/// Server channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// WebSocket URL of the conversation server.
    pub url: String,
    /// Fixed retry period after connection loss, in milliseconds.
    pub reconnect_interval_ms: u64,
    /// Speaker name of the human counterpart; their subtitles are rendered.
    pub counterpart_speaker: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws".to_owned(),
            reconnect_interval_ms: 5_000,
            counterpart_speaker: "user".to_owned(),
        }
    }
}

impl ChannelConfig {
    /// Retry period as a [`Duration`].
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// HTTP endpoint of the synthesis service.
    pub url: String,
    /// Deadline for the synthesis call, in milliseconds. On expiry the call
    /// is aborted and the turn plays no audio.
    pub timeout_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/synthesize".to_owned(),
            timeout_ms: 15_000,
        }
    }
}

impl SynthesisConfig {
    /// Request deadline as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Playback buffering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Capacity of the chunk channel between the stream consumer and the
    /// decoder. A full channel suspends the download (backpressure).
    pub buffer_chunks: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { buffer_chunks: 32 }
    }
}

/// Inbound event dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Trailing window within which a repeated `(motion, text)` assistant
    /// turn is suppressed as a duplicate delivery, in milliseconds.
    pub dedupe_window_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dedupe_window_ms: 2_000,
        }
    }
}

impl DispatchConfig {
    /// Dedupe window as a [`Duration`].
    #[must_use]
    pub fn dedupe_window(&self) -> Duration {
        Duration::from_millis(self.dedupe_window_ms)
    }
}

impl RelayConfig {
    /// Load and validate a configuration file (TOML).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("failed to read config ({}): {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&raw).map_err(|e| {
            RelayError::Config(format!("invalid config ({}): {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate field values.
    pub fn validate(&self) -> Result<()> {
        let channel_url = url::Url::parse(&self.channel.url)
            .map_err(|e| RelayError::Config(format!("invalid channel url: {e}")))?;
        match channel_url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(RelayError::Config(format!(
                    "channel url must be ws:// or wss://, got {other}://"
                )));
            }
        }

        url::Url::parse(&self.synthesis.url)
            .map_err(|e| RelayError::Config(format!("invalid synthesis url: {e}")))?;

        if self.playback.buffer_chunks == 0 {
            return Err(RelayError::Config(
                "playback.buffer_chunks must be at least 1".to_owned(),
            ));
        }

        Ok(())
    }
}
