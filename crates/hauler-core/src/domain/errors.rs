//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and invalid status transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid file identifier
    #[error("Invalid file id: {0}")]
    InvalidFileId(String),

    /// Invalid upload handle (must be an absolute http(s) URL)
    #[error("Invalid upload handle: {0}")]
    InvalidHandle(String),

    /// Invalid target path format or content
    #[error("Invalid target path: {0}")]
    InvalidPath(String),

    /// Invalid status transition attempt
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status
        from: String,
        /// The attempted target status
        to: String,
    },

    /// Offset would violate `0 <= offset <= file_size`
    #[error("Offset {offset} out of range for file of {file_size} bytes")]
    OffsetOutOfRange {
        /// The rejected offset
        offset: u64,
        /// Total size of the file
        file_size: u64,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("bad".to_string());
        assert_eq!(err.to_string(), "Invalid target path: bad");

        let err = DomainError::InvalidTransition {
            from: "Completed".to_string(),
            to: "Uploading".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition from Completed to Uploading"
        );

        let err = DomainError::OffsetOutOfRange {
            offset: 10,
            file_size: 5,
        };
        assert_eq!(err.to_string(), "Offset 10 out of range for file of 5 bytes");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidPath("/p".to_string());
        let err2 = DomainError::InvalidPath("/p".to_string());
        let err3 = DomainError::InvalidPath("/q".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
