//! Contract tests for the synthesis HTTP client against a mock service.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use voxrelay::config::SynthesisConfig;
use voxrelay::{AudioStream, RelayError, SynthesisClient};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout_ms: u64) -> SynthesisClient {
    SynthesisClient::new(&SynthesisConfig {
        url: format!("{}/synthesize", server.uri()),
        timeout_ms,
    })
}

async fn drain(mut stream: AudioStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next_chunk().await {
        out.extend_from_slice(&chunk);
    }
    out
}

#[tokio::test]
async fn audio_response_streams_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/synthesize"))
        .and(body_partial_json(serde_json::json!({ "text": "hello there" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(b"mpeg-frames".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5_000);
    let cancel = CancellationToken::new();

    let stream = client
        .synthesize("hello there", &cancel)
        .await
        .unwrap()
        .expect("audio response should open a stream");
    assert_eq!(drain(stream).await, b"mpeg-frames");
}

#[tokio::test]
async fn no_content_response_plays_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/synthesize"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5_000);
    let cancel = CancellationToken::new();

    let result = client.synthesize("hello", &cancel).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn non_audio_content_type_plays_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/synthesize"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"detail":"voice unavailable"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5_000);
    let cancel = CancellationToken::new();

    let result = client.synthesize("hello", &cancel).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn empty_audio_body_plays_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/synthesize"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "audio/wav"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5_000);
    let cancel = CancellationToken::new();

    let result = client.synthesize("hello", &cancel).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn server_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/synthesize"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5_000);
    let cancel = CancellationToken::new();

    let err = client.synthesize("hello", &cancel).await.unwrap_err();
    assert!(matches!(err, RelayError::Synthesis(_)));
}

#[tokio::test]
async fn slow_service_times_out_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/synthesize"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 50);
    let cancel = CancellationToken::new();

    let result = client.synthesize("hello", &cancel).await.unwrap();
    assert!(result.is_none());
}
