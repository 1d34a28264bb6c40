//! Error types for the spoken-response delivery pipeline.

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Server channel (WebSocket) error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Speech synthesis request error.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Media decoder error.
    #[error("decoder error: {0}")]
    Decoder(String),

    /// Audio sink error.
    #[error("sink error: {0}")]
    Sink(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, RelayError>;
