//! Hauler Engine - resumable upload orchestration
//!
//! Provides:
//! - Concurrency-bounded scheduling of per-file upload tasks
//! - Pause / resume / cancel / retry-with-replace control
//! - Offset-conflict reconciliation and linear-backoff retries
//! - Synchronous progress subscriptions with smoothed speed and ETA
//!
//! ## Modules
//!
//! - [`engine`] - `UploadEngine` facade: the public control/observation API
//! - [`scheduler`] - bounded-concurrency queue and active set
//! - [`source`] - `IFileSource` adapters for local files and in-memory bytes
//! - [`progress`] - per-record progress state feeding the speed estimator

pub mod engine;
pub mod progress;
pub mod scheduler;
pub mod source;

mod transfer;

pub use engine::UploadEngine;
pub use source::{BytesSource, LocalFileSource};

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur preparing uploads
#[derive(Debug, Error)]
pub enum EngineError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The path does not point at a regular file
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// A domain-level error propagated from hauler-core
    #[error("Domain error: {0}")]
    DomainError(#[from] hauler_core::domain::errors::DomainError),
}
