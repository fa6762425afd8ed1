//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// FileId
// ============================================================================

/// Stable opaque identifier for one queued file
///
/// Unique for the lifetime of the process and never reused. Derived from the
/// sanitized file name, the file size, the enqueue timestamp, and a random
/// suffix so that enqueueing the same file twice yields distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Derives a fresh id for a file being enqueued
    ///
    /// # Arguments
    /// * `file_name` - Original file name (sanitized before use)
    /// * `file_size` - File size in bytes
    #[must_use]
    pub fn derive(file_name: &str, file_size: u64) -> Self {
        let sanitized: String = file_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let ts = chrono::Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{sanitized}-{file_size}-{ts}-{}", &suffix[..8]))
    }

    /// Wraps an existing raw id, validating that it is non-empty
    pub fn new(raw: String) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::InvalidFileId("empty id".to_string()));
        }
        Ok(Self(raw))
    }

    /// Returns the raw id string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// UploadHandle
// ============================================================================

/// Server-issued upload resource URL
///
/// Returned from the create step and used for all subsequent offset queries,
/// chunk appends, and deletion. Must be an absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadHandle(String);

impl UploadHandle {
    /// Creates a handle, validating the URL scheme
    pub fn new(url: String) -> Result<Self, DomainError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(Self(url))
        } else {
            Err(DomainError::InvalidHandle(url))
        }
    }

    /// Returns the handle URL
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UploadHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TargetPath
// ============================================================================

/// Destination directory path on the server
///
/// Must be absolute (start with `/`) and may not contain `..` segments.
/// For folder uploads the per-file target is derived by joining the relative
/// directory of each file, preserving nested structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetPath(String);

impl TargetPath {
    /// Creates a validated target path
    pub fn new(path: String) -> Result<Self, DomainError> {
        if !path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "must be absolute: {path}"
            )));
        }
        if path.split('/').any(|seg| seg == "..") {
            return Err(DomainError::InvalidPath(format!(
                "parent traversal not allowed: {path}"
            )));
        }
        // Normalize trailing slash, but keep the bare root
        let normalized = if path.len() > 1 {
            path.trim_end_matches('/').to_string()
        } else {
            path
        };
        Ok(Self(normalized))
    }

    /// The server root directory
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Joins a relative directory onto this path
    ///
    /// Used to preserve folder structure on multi-file uploads: a file at
    /// `photos/2024/img.jpg` uploaded against `/inbox` lands in
    /// `/inbox/photos/2024`.
    ///
    /// # Arguments
    /// * `relative` - Relative directory (no leading `/`, no `..`)
    pub fn join(&self, relative: &str) -> Result<Self, DomainError> {
        let trimmed = relative.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(self.clone());
        }
        if trimmed.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return Err(DomainError::InvalidPath(format!(
                "invalid relative segment: {relative}"
            )));
        }
        if self.0 == "/" {
            Self::new(format!("/{trimmed}"))
        } else {
            Self::new(format!("{}/{trimmed}", self.0))
        }
    }

    /// Returns the path string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TargetPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- FileId ----

    #[test]
    fn test_file_id_derive_is_unique() {
        let a = FileId::derive("report.pdf", 1024);
        let b = FileId::derive("report.pdf", 1024);
        assert_ne!(a, b);
    }

    #[test]
    fn test_file_id_derive_sanitizes_name() {
        let id = FileId::derive("my report (final).pdf", 10);
        assert!(id.as_str().starts_with("my_report__final_.pdf-10-"));
    }

    #[test]
    fn test_file_id_rejects_empty() {
        assert!(FileId::new("  ".to_string()).is_err());
        assert!(FileId::new("abc".to_string()).is_ok());
    }

    // ---- UploadHandle ----

    #[test]
    fn test_upload_handle_accepts_http_urls() {
        assert!(UploadHandle::new("http://host/upload/abc".to_string()).is_ok());
        assert!(UploadHandle::new("https://host/upload/abc".to_string()).is_ok());
    }

    #[test]
    fn test_upload_handle_rejects_relative() {
        assert!(UploadHandle::new("/upload/abc".to_string()).is_err());
        assert!(UploadHandle::new("ftp://host/x".to_string()).is_err());
    }

    // ---- TargetPath ----

    #[test]
    fn test_target_path_requires_absolute() {
        assert!(TargetPath::new("docs".to_string()).is_err());
        assert!(TargetPath::new("/docs".to_string()).is_ok());
    }

    #[test]
    fn test_target_path_rejects_traversal() {
        assert!(TargetPath::new("/docs/../etc".to_string()).is_err());
    }

    #[test]
    fn test_target_path_normalizes_trailing_slash() {
        let p = TargetPath::new("/docs/".to_string()).unwrap();
        assert_eq!(p.as_str(), "/docs");

        let root = TargetPath::new("/".to_string()).unwrap();
        assert_eq!(root.as_str(), "/");
    }

    #[test]
    fn test_target_path_join() {
        let base = TargetPath::new("/inbox".to_string()).unwrap();
        let joined = base.join("photos/2024").unwrap();
        assert_eq!(joined.as_str(), "/inbox/photos/2024");

        let root = TargetPath::root();
        assert_eq!(root.join("a/b").unwrap().as_str(), "/a/b");
    }

    #[test]
    fn test_target_path_join_empty_is_identity() {
        let base = TargetPath::new("/inbox".to_string()).unwrap();
        assert_eq!(base.join("").unwrap(), base);
        assert_eq!(base.join("/").unwrap(), base);
    }

    #[test]
    fn test_target_path_join_rejects_traversal() {
        let base = TargetPath::new("/inbox".to_string()).unwrap();
        assert!(base.join("../secret").is_err());
        assert!(base.join("a//b").is_err());
    }
}
