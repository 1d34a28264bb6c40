//! Incremental audio playback: chunked stream consumption, FIFO buffering in
//! front of the decoder, and per-turn session lifecycle.

mod buffer;
pub(crate) mod session;
mod stream;
pub mod traits;
