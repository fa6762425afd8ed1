//! Wire operations of the resumable upload protocol
//!
//! Provides the five operations the engine consumes:
//! - [`create_upload`] - `POST /upload`, negotiates a new upload resource
//! - [`query_offset`] - `HEAD <handle>`, authoritative acknowledged byte count
//! - [`append_chunk`] - `PATCH <handle>`, uploads one chunk at an exact offset
//! - [`delete_upload`] - `DELETE <handle>`, best-effort cleanup
//! - [`fetch_config`] - `GET /upload-config`, server-advertised settings
//!
//! Every operation races the HTTP round-trip against a [`CancellationToken`]
//! so pause/cancel interrupts an in-flight call without leaking the
//! underlying connection.

use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hauler_core::domain::newtypes::UploadHandle;
use hauler_core::domain::record::UploadRecord;
use hauler_core::ports::upload_server::{ProtocolError, RemoteTransferConfig};

use crate::client::{
    TusClient, OFFSET_CONTENT_TYPE, UPLOAD_LENGTH, UPLOAD_METADATA, UPLOAD_OFFSET,
};
use crate::metadata::encode_metadata;

// ============================================================================
// Shared plumbing
// ============================================================================

/// Sends a request, racing it against the cancellation token
async fn send_cancellable(
    request: RequestBuilder,
    cancel: &CancellationToken,
) -> Result<Response, ProtocolError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ProtocolError::Cancelled),
        result = request.send() => result.map_err(transport_error),
    }
}

/// Maps a reqwest error (timeout, reset, DNS) to a transport failure
fn transport_error(err: reqwest::Error) -> ProtocolError {
    ProtocolError::Transport(err.to_string())
}

/// Extracts and parses the `Upload-Offset` response header
fn parse_offset(response: &Response, operation: &str) -> Result<u64, ProtocolError> {
    response
        .headers()
        .get(UPLOAD_OFFSET)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| {
            ProtocolError::Protocol(format!(
                "{operation} response missing or invalid {UPLOAD_OFFSET} header"
            ))
        })
}

// ============================================================================
// create_upload
// ============================================================================

/// Negotiates a new resumable upload resource
///
/// Sends `POST {base}/upload` with `Upload-Length` and `Upload-Metadata`
/// (at minimum `filename` and `path`). Expects a success status and a
/// `Location` header identifying the new resource; the location may be
/// relative and is resolved against the endpoint base URL.
pub async fn create_upload(
    client: &TusClient,
    record: &UploadRecord,
    cancel: &CancellationToken,
) -> Result<UploadHandle, ProtocolError> {
    let metadata = encode_metadata(record.file_name(), record.target_path().as_str());
    debug!(
        file = record.file_name(),
        size = record.file_size(),
        "Creating upload resource"
    );

    let request = client
        .request(Method::POST, "/upload")
        .header(UPLOAD_LENGTH, record.file_size().to_string())
        .header(UPLOAD_METADATA, metadata);

    let response = send_cancellable(request, cancel).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProtocolError::Protocol(format!(
            "create returned status {status}"
        )));
    }

    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ProtocolError::Protocol("create response missing Location header".to_string())
        })?;

    let url = client.resolve_location(location);
    debug!(handle = %url, "Upload resource created");
    UploadHandle::new(url).map_err(|e| ProtocolError::Protocol(e.to_string()))
}

// ============================================================================
// query_offset
// ============================================================================

/// Fetches the server's authoritative acknowledged byte count
///
/// Sends `HEAD <handle>` and reads the `Upload-Offset` response header.
pub async fn query_offset(
    client: &TusClient,
    handle: &UploadHandle,
    cancel: &CancellationToken,
) -> Result<u64, ProtocolError> {
    let request = client.request_url(Method::HEAD, handle.as_str());
    let response = send_cancellable(request, cancel).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProtocolError::Protocol(format!(
            "offset query returned status {status}"
        )));
    }

    let offset = parse_offset(&response, "offset query")?;
    debug!(handle = %handle, offset, "Server offset queried");
    Ok(offset)
}

// ============================================================================
// append_chunk
// ============================================================================

/// Uploads exactly one chunk starting at `offset`
///
/// Sends `PATCH <handle>` with `Upload-Offset` and the offset content type.
/// A 409 response signals that the server's recorded offset diverges from
/// `offset`; this is reported as [`ProtocolError::OffsetConflict`] and is
/// resolved by the caller, not retried here.
///
/// # Returns
/// The new acknowledged offset from the response's `Upload-Offset` header.
pub async fn append_chunk(
    client: &TusClient,
    handle: &UploadHandle,
    offset: u64,
    data: &[u8],
    cancel: &CancellationToken,
) -> Result<u64, ProtocolError> {
    debug!(handle = %handle, offset, len = data.len(), "Appending chunk");

    let request = client
        .request_url(Method::PATCH, handle.as_str())
        .header(header::CONTENT_TYPE, OFFSET_CONTENT_TYPE)
        .header(UPLOAD_OFFSET, offset.to_string())
        .body(data.to_vec());

    let response = send_cancellable(request, cancel).await?;
    let status = response.status();

    if status == StatusCode::CONFLICT {
        debug!(handle = %handle, offset, "Append rejected: offset conflict");
        return Err(ProtocolError::OffsetConflict);
    }
    if !status.is_success() {
        return Err(ProtocolError::Protocol(format!(
            "append returned status {status}"
        )));
    }

    let new_offset = parse_offset(&response, "append")?;
    debug!(handle = %handle, new_offset, "Chunk acknowledged");
    Ok(new_offset)
}

// ============================================================================
// delete_upload
// ============================================================================

/// Deletes an upload resource
///
/// Best-effort from the caller's perspective: the engine logs a failure and
/// moves on without retrying.
pub async fn delete_upload(
    client: &TusClient,
    handle: &UploadHandle,
    cancel: &CancellationToken,
) -> Result<(), ProtocolError> {
    let request = client.request_url(Method::DELETE, handle.as_str());
    let response = send_cancellable(request, cancel).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProtocolError::Protocol(format!(
            "delete returned status {status}"
        )));
    }

    debug!(handle = %handle, "Upload resource deleted");
    Ok(())
}

// ============================================================================
// fetch_config
// ============================================================================

/// Fetches server-advertised transfer settings
///
/// Sends `GET {base}/upload-config`. A 404 means the server does not expose
/// the endpoint; the engine then keeps its local defaults.
pub async fn fetch_config(
    client: &TusClient,
    cancel: &CancellationToken,
) -> Result<Option<RemoteTransferConfig>, ProtocolError> {
    let request = client.request(Method::GET, "/upload-config");
    let response = send_cancellable(request, cancel).await?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        debug!("Server exposes no upload-config endpoint");
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ProtocolError::Protocol(format!(
            "config fetch returned status {status}"
        )));
    }

    let config: RemoteTransferConfig = response
        .json()
        .await
        .map_err(|e| ProtocolError::Protocol(format!("invalid upload-config body: {e}")))?;

    debug!(?config, "Fetched server transfer config");
    Ok(Some(config))
}
