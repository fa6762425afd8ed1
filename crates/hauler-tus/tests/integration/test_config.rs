//! Integration tests for the upload-config fetch

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hauler_core::ports::upload_server::ProtocolError;
use hauler_tus::{protocol, TusClient};

use crate::common;

#[tokio::test]
async fn test_fetch_config_parses_body() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/upload-config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "chunkSize": 8_388_608u64,
            "maxConcurrentUploads": 6
        })))
        .mount(&server)
        .await;

    let config = protocol::fetch_config(&client, &CancellationToken::new())
        .await
        .expect("config fetch failed")
        .expect("config missing");

    assert_eq!(config.chunk_size, Some(8_388_608));
    assert_eq!(config.max_concurrent_uploads, Some(6));
}

#[tokio::test]
async fn test_fetch_config_absent_endpoint_is_none() {
    let server = MockServer::start().await;
    let client = TusClient::new(server.uri());

    let config = protocol::fetch_config(&client, &CancellationToken::new())
        .await
        .expect("config fetch failed");
    assert!(config.is_none());
}

#[tokio::test]
async fn test_fetch_config_invalid_body_is_protocol_error() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/upload-config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = protocol::fetch_config(&client, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Protocol(_)));
}
