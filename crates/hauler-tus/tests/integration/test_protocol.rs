//! Integration tests for the four wire operations

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_bytes, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hauler_core::ports::upload_server::ProtocolError;
use hauler_tus::{protocol, TusClient};

use crate::common;

// ============================================================================
// create_upload
// ============================================================================

#[tokio::test]
async fn test_create_resolves_relative_location() {
    let (server, client) = common::setup().await;
    common::mount_create(&server, "/upload/abc123").await;

    let record = common::record("video.mp4", 4096);
    let handle = protocol::create_upload(&client, &record, &CancellationToken::new())
        .await
        .expect("create failed");

    assert_eq!(handle.as_str(), format!("{}/upload/abc123", server.uri()));
}

#[tokio::test]
async fn test_create_keeps_absolute_location() {
    let (server, client) = common::setup().await;
    common::mount_create(&server, "https://storage.example.com/upload/xyz").await;

    let record = common::record("video.mp4", 4096);
    let handle = protocol::create_upload(&client, &record, &CancellationToken::new())
        .await
        .expect("create failed");

    assert_eq!(handle.as_str(), "https://storage.example.com/upload/xyz");
}

#[tokio::test]
async fn test_create_sends_length_version_and_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("Tus-Resumable", "1.0.0"))
        .and(header("Upload-Length", "4096"))
        .and(header_exists("Upload-Metadata"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/upload/ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = TusClient::new(server.uri());
    let record = common::record("video.mp4", 4096);
    protocol::create_upload(&client, &record, &CancellationToken::new())
        .await
        .expect("create failed");
}

#[tokio::test]
async fn test_create_missing_location_is_protocol_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let record = common::record("video.mp4", 4096);
    let err = protocol::create_upload(&client, &record, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::Protocol(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_create_server_error_is_protocol_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let record = common::record("video.mp4", 4096);
    let err = protocol::create_upload(&client, &record, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Protocol(_)));
}

// ============================================================================
// query_offset
// ============================================================================

#[tokio::test]
async fn test_query_offset_reads_header() {
    let (server, client) = common::setup().await;
    common::mount_offset(&server, "/upload/abc", 8_388_608).await;

    let handle = common::handle(&server, "/upload/abc");
    let offset = protocol::query_offset(&client, &handle, &CancellationToken::new())
        .await
        .expect("offset query failed");

    assert_eq!(offset, 8_388_608);
}

#[tokio::test]
async fn test_query_offset_missing_header_is_protocol_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("HEAD"))
        .and(path("/upload/abc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let handle = common::handle(&server, "/upload/abc");
    let err = protocol::query_offset(&client, &handle, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Protocol(_)));
}

// ============================================================================
// append_chunk
// ============================================================================

#[tokio::test]
async fn test_append_sends_offset_and_body() {
    let server = MockServer::start().await;
    let chunk = vec![7u8; 512];

    Mock::given(method("PATCH"))
        .and(path("/upload/abc"))
        .and(header("Tus-Resumable", "1.0.0"))
        .and(header("Upload-Offset", "1024"))
        .and(header("Content-Type", "application/offset+octet-stream"))
        .and(body_bytes(chunk.clone()))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "1536"))
        .expect(1)
        .mount(&server)
        .await;

    let client = TusClient::new(server.uri());
    let handle = common::handle(&server, "/upload/abc");
    let new_offset =
        protocol::append_chunk(&client, &handle, 1024, &chunk, &CancellationToken::new())
            .await
            .expect("append failed");

    assert_eq!(new_offset, 1536);
}

#[tokio::test]
async fn test_append_conflict_is_distinguished() {
    let (server, client) = common::setup().await;

    Mock::given(method("PATCH"))
        .and(path("/upload/abc"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let handle = common::handle(&server, "/upload/abc");
    let err = protocol::append_chunk(&client, &handle, 0, b"data", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::OffsetConflict));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_append_missing_offset_header_is_protocol_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("PATCH"))
        .and(path("/upload/abc"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let handle = common::handle(&server, "/upload/abc");
    let err = protocol::append_chunk(&client, &handle, 0, b"data", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Protocol(_)));
}

// ============================================================================
// delete_upload
// ============================================================================

#[tokio::test]
async fn test_delete_succeeds() {
    let (server, client) = common::setup().await;

    Mock::given(method("DELETE"))
        .and(path("/upload/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let handle = common::handle(&server, "/upload/abc");
    protocol::delete_upload(&client, &handle, &CancellationToken::new())
        .await
        .expect("delete failed");
}

#[tokio::test]
async fn test_delete_failure_is_reported() {
    let (server, client) = common::setup().await;

    Mock::given(method("DELETE"))
        .and(path("/upload/abc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let handle = common::handle(&server, "/upload/abc");
    let err = protocol::delete_upload(&client, &handle, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Protocol(_)));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_token_interrupts_in_flight_call() {
    let (server, client) = common::setup().await;

    // The response is slow enough that the cancelled token always wins
    Mock::given(method("HEAD"))
        .and(path("/upload/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Upload-Offset", "0")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let handle = common::handle(&server, "/upload/abc");
    let err = protocol::query_offset(&client, &handle, &token)
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::Cancelled));
    assert!(!err.is_retryable());
}
