//! Persistent bidirectional server channel: wire events and the connection
//! lifecycle task.

pub mod connection;
pub mod events;
