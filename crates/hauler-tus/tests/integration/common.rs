//! Shared helpers for protocol integration tests

use hauler_core::domain::newtypes::{TargetPath, UploadHandle};
use hauler_core::domain::record::UploadRecord;
use hauler_tus::TusClient;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Starts a mock server and a client pointed at it
pub async fn setup() -> (MockServer, TusClient) {
    let server = MockServer::start().await;
    let client = TusClient::new(server.uri());
    (server, client)
}

/// Builds a pending record for `name` with `size` bytes targeting `/`
pub fn record(name: &str, size: u64) -> UploadRecord {
    UploadRecord::new(name.to_string(), size, TargetPath::root(), 1024, 3)
}

/// Builds a handle pointing at `resource_path` on the mock server
pub fn handle(server: &MockServer, resource_path: &str) -> UploadHandle {
    UploadHandle::new(format!("{}{}", server.uri(), resource_path)).unwrap()
}

/// Mounts a create endpoint answering 201 with the given Location
pub async fn mount_create(server: &MockServer, location: &str) {
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", location))
        .mount(server)
        .await;
}

/// Mounts a HEAD endpoint answering with the given Upload-Offset
pub async fn mount_offset(server: &MockServer, resource_path: &str, offset: u64) {
    Mock::given(method("HEAD"))
        .and(path(resource_path))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Upload-Offset", offset.to_string()),
        )
        .mount(server)
        .await;
}
