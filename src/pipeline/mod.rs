//! The coordinator task and the messages that flow between stages.

pub mod coordinator;
pub mod dispatch;
pub mod messages;
