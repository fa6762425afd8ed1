//! Per-file upload record and status machine
//!
//! One [`UploadRecord`] exists per queued file. It is mutated only by the
//! per-file upload task that owns it; all control operations go through the
//! engine, which serializes access. The status machine enforces the legal
//! transitions and the offset invariant `0 <= offset <= file_size`.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{FileId, TargetPath, UploadHandle};

// ============================================================================
// UploadStatus
// ============================================================================

/// Lifecycle status of an upload
///
/// ```text
/// Pending ──→ Uploading ──→ { Completed | Error | Paused }
///    ↑↓ (pause while queued)      Paused ──→ Pending (resume)
///                                 Error  ──→ Pending (retry with replace)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Queued, waiting for a free transfer slot
    Pending,
    /// Actively transferring chunks
    Uploading,
    /// All bytes acknowledged by the server
    Completed,
    /// Terminal failure; only `retry_with_replace` leaves this state
    Error,
    /// Suspended by the caller; resumable
    Paused,
}

impl UploadStatus {
    /// Returns true if no further transfer work will happen in this status
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true if the status machine allows moving to `to`
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        use UploadStatus::*;
        matches!(
            (self, to),
            (Pending, Uploading)
                | (Pending, Paused)
                | (Uploading, Completed)
                | (Uploading, Error)
                | (Uploading, Paused)
                | (Paused, Pending)
                | (Error, Pending)
        )
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Paused => "paused",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// UploadRecord
// ============================================================================

/// Mutable per-file upload state
///
/// Owned exclusively by the engine; only the per-file upload task writes
/// `offset` and `status`. The offset is monotonically non-decreasing except
/// when explicitly overwritten after a resolved conflict.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    file_id: FileId,
    file_name: String,
    file_size: u64,
    target_path: TargetPath,
    upload_handle: Option<UploadHandle>,
    offset: u64,
    retry_count: u32,
    max_retries: u32,
    chunk_size: u64,
    status: UploadStatus,
    error: Option<String>,
    /// Whether the local offset is known to match the server.
    /// False after create and after a conflict, forcing an offset re-query.
    offset_trusted: bool,
}

impl UploadRecord {
    /// Creates a fresh `Pending` record for an enqueued file
    ///
    /// # Arguments
    /// * `file_name` - Original file name (used for the wire metadata)
    /// * `file_size` - Total size in bytes
    /// * `target_path` - Destination directory on the server
    /// * `chunk_size` - Bytes per append request, fixed for this record
    /// * `max_retries` - Retry budget for transient chunk failures
    #[must_use]
    pub fn new(
        file_name: String,
        file_size: u64,
        target_path: TargetPath,
        chunk_size: u64,
        max_retries: u32,
    ) -> Self {
        let file_id = FileId::derive(&file_name, file_size);
        Self {
            file_id,
            file_name,
            file_size,
            target_path,
            upload_handle: None,
            offset: 0,
            retry_count: 0,
            max_retries,
            chunk_size: chunk_size.max(1),
            status: UploadStatus::Pending,
            error: None,
            offset_trusted: false,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn target_path(&self) -> &TargetPath {
        &self.target_path
    }

    pub fn upload_handle(&self) -> Option<&UploadHandle> {
        self.upload_handle.as_ref()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn offset_trusted(&self) -> bool {
        self.offset_trusted
    }

    /// True once every byte has been acknowledged
    pub fn is_complete(&self) -> bool {
        self.offset == self.file_size
    }

    /// Byte range of the next chunk: `offset .. min(offset + chunk_size, file_size)`
    pub fn next_chunk_range(&self) -> (u64, u64) {
        let end = (self.offset + self.chunk_size).min(self.file_size);
        (self.offset, end)
    }

    // ------------------------------------------------------------------
    // Mutations (single-writer: the owning upload task or the engine)
    // ------------------------------------------------------------------

    /// Transitions to a new status, enforcing the transition table
    pub fn set_status(&mut self, to: UploadStatus) -> Result<(), DomainError> {
        if !self.status.can_transition(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        if to != UploadStatus::Error {
            self.error = None;
        }
        self.status = to;
        Ok(())
    }

    /// Transitions to `Error` with a failure message
    pub fn set_error(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        self.set_status(UploadStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// Overwrites the acknowledged offset and marks it trusted
    ///
    /// Accepts any value within `0..=file_size`: the server's authoritative
    /// offset may be lower than the local one after a resolved conflict.
    pub fn set_offset(&mut self, offset: u64) -> Result<(), DomainError> {
        if offset > self.file_size {
            return Err(DomainError::OffsetOutOfRange {
                offset,
                file_size: self.file_size,
            });
        }
        self.offset = offset;
        self.offset_trusted = true;
        Ok(())
    }

    /// Marks the local offset stale so the next loop iteration re-queries it
    pub fn mark_offset_untrusted(&mut self) {
        self.offset_trusted = false;
    }

    /// Stores the server-issued handle from a successful create
    pub fn set_upload_handle(&mut self, handle: UploadHandle) {
        self.upload_handle = Some(handle);
        self.offset_trusted = false;
    }

    /// Increments the retry counter and returns the new value
    pub fn increment_retry(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }

    /// Returns true once the retry budget is exhausted
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count > self.max_retries
    }

    /// Resets the retry counter after a successful append
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Resets the record for a confirmed destination overwrite
    ///
    /// Drops the handle, rewinds the offset, clears the retry budget and the
    /// error, and re-queues the record. Only legal from `Error`.
    pub fn reset_for_replace(&mut self) -> Result<(), DomainError> {
        self.set_status(UploadStatus::Pending)?;
        self.upload_handle = None;
        self.offset = 0;
        self.retry_count = 0;
        self.error = None;
        self.offset_trusted = false;
        Ok(())
    }
}
