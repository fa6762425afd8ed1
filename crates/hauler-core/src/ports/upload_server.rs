//! Upload server port (driven/secondary port)
//!
//! This module defines the interface for the remote side of the resumable
//! upload protocol. The primary implementation speaks a TUS-1.0.0-style HTTP
//! protocol, but the trait is transport-agnostic so tests can script a
//! server in memory.
//!
//! ## Design Notes
//!
//! - Errors use a dedicated [`ProtocolError`] enum rather than `anyhow`
//!   because the per-file loop must distinguish an offset conflict (an
//!   expected synchronization event) from a transport failure (counted
//!   against the retry budget) and from cancellation (suppresses all
//!   further transitions).
//! - Every operation takes a [`CancellationToken`] so pause/cancel can
//!   interrupt an in-flight call without leaking the connection.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::newtypes::UploadHandle;
use crate::domain::record::UploadRecord;

// ============================================================================
// ProtocolError
// ============================================================================

/// Failure modes of the four wire operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The server rejected an append because the client's assumed offset
    /// diverges from the server's recorded offset (HTTP 409). Not counted
    /// against the retry budget; resolved by re-querying the offset.
    #[error("upload offset conflict")]
    OffsetConflict,

    /// Network-level failure: timeout, connection reset, DNS. Retryable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered, but not as the protocol requires: unexpected
    /// status code, missing `Location` or `Upload-Offset` header. Treated
    /// like a transport failure for retry purposes.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The operation was interrupted by pause or cancel. Not an error;
    /// the caller already decided the record's fate.
    #[error("operation cancelled")]
    Cancelled,
}

impl ProtocolError {
    /// Returns true if the per-file loop should count this failure against
    /// the retry budget and back off
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol(_))
    }
}

// ============================================================================
// RemoteTransferConfig
// ============================================================================

/// Server-advertised transfer settings
///
/// Fetched once at engine startup from `GET /upload-config`; any field the
/// server omits keeps its locally configured value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTransferConfig {
    /// Bytes per append request
    pub chunk_size: Option<u64>,
    /// Maximum concurrent transfers
    pub max_concurrent_uploads: Option<u32>,
}

// ============================================================================
// IUploadServer trait
// ============================================================================

/// Port trait for the remote resumable-upload endpoint
///
/// All four operations support cooperative cancellation: implementations
/// must return [`ProtocolError::Cancelled`] promptly once the token fires,
/// aborting the underlying request.
#[async_trait::async_trait]
pub trait IUploadServer: Send + Sync {
    /// Negotiates a new resumable upload resource
    ///
    /// # Arguments
    /// * `record` - The record being created; supplies size, name, and target path
    /// * `cancel` - Cooperative cancellation token
    ///
    /// # Returns
    /// The server-issued handle used for all subsequent operations
    async fn create_upload(
        &self,
        record: &UploadRecord,
        cancel: &CancellationToken,
    ) -> Result<UploadHandle, ProtocolError>;

    /// Fetches the server's authoritative byte count for a resource
    async fn query_offset(
        &self,
        handle: &UploadHandle,
        cancel: &CancellationToken,
    ) -> Result<u64, ProtocolError>;

    /// Uploads exactly one chunk starting at `offset`
    ///
    /// # Returns
    /// The new acknowledged offset on success; [`ProtocolError::OffsetConflict`]
    /// when the server's recorded offset differs from `offset`.
    async fn append_chunk(
        &self,
        handle: &UploadHandle,
        offset: u64,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<u64, ProtocolError>;

    /// Deletes an upload resource; best-effort from the caller's perspective
    async fn delete_upload(
        &self,
        handle: &UploadHandle,
        cancel: &CancellationToken,
    ) -> Result<(), ProtocolError>;

    /// Fetches server-advertised transfer settings
    ///
    /// Returns `Ok(None)` when the server does not expose a config endpoint.
    async fn fetch_config(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<RemoteTransferConfig>, ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProtocolError::Transport("reset".into()).is_retryable());
        assert!(ProtocolError::Protocol("missing header".into()).is_retryable());
        assert!(!ProtocolError::OffsetConflict.is_retryable());
        assert!(!ProtocolError::Cancelled.is_retryable());
    }

    #[test]
    fn test_remote_config_deserialization() {
        let json = r#"{ "chunkSize": 8388608, "maxConcurrentUploads": 6 }"#;
        let cfg: RemoteTransferConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.chunk_size, Some(8388608));
        assert_eq!(cfg.max_concurrent_uploads, Some(6));
    }

    #[test]
    fn test_remote_config_partial() {
        let json = r#"{ "chunkSize": 1048576 }"#;
        let cfg: RemoteTransferConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.chunk_size, Some(1048576));
        assert!(cfg.max_concurrent_uploads.is_none());
    }
}
