//! Wire protocol for the bidirectional server channel.
//!
//! Events are JSON objects tagged by a `type` field. Transport-level
//! connect/disconnect have no payload and surface as
//! [`ConnectionState`](crate::pipeline::messages::ConnectionState) changes
//! rather than as variants here.

use serde::{Deserialize, Serialize};

/// Events received from the conversation server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The server assigned (or confirmed) a session identity.
    SessionRegistered { session_id: String },
    /// A subtitle line for one of the speakers.
    Subtitle { speaker: String, text: String },
    /// One assistant reply, driving dedupe and synthesis.
    AiResponse {
        text: String,
        #[serde(default)]
        motion: Option<String>,
    },
    /// Assistant status text, reflected to the UI only.
    AiStatus { status: String },
}

/// Events sent to the conversation server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Re-register a previously assigned session identity after reconnect.
    ClientRegisterSession { session_id: String },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn client_event_serialize_register() {
        let event = ClientEvent::ClientRegisterSession {
            session_id: "s-42".into(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"type\":\"client_register_session\""));
        assert!(json.contains("\"session_id\":\"s-42\""));
    }

    #[test]
    fn server_event_deserialize_ai_response() {
        let json = r#"{"type":"ai_response","text":"Hello","motion":"wave"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        match event {
            ServerEvent::AiResponse { text, motion } => {
                assert_eq!(text, "Hello");
                assert_eq!(motion.as_deref(), Some("wave"));
            }
            _ => unreachable!("expected AiResponse"),
        }
    }

    #[test]
    fn server_event_motion_is_optional() {
        let json = r#"{"type":"ai_response","text":"Hello"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        match event {
            ServerEvent::AiResponse { motion, .. } => assert!(motion.is_none()),
            _ => unreachable!("expected AiResponse"),
        }
    }

    #[test]
    fn server_event_deserialize_subtitle() {
        let json = r#"{"type":"subtitle","speaker":"user","text":"hi there"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        match event {
            ServerEvent::Subtitle { speaker, text } => {
                assert_eq!(speaker, "user");
                assert_eq!(text, "hi there");
            }
            _ => unreachable!("expected Subtitle"),
        }
    }

    #[test]
    fn server_event_deserialize_session_registered() {
        let json = r#"{"type":"session_registered","session_id":"abc"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        assert!(matches!(
            event,
            ServerEvent::SessionRegistered { session_id } if session_id == "abc"
        ));
    }

    #[test]
    fn unknown_event_type_is_an_error() {
        let json = r#"{"type":"mystery","payload":1}"#;
        assert!(serde_json::from_str::<ServerEvent>(json).is_err());
    }
}
