//! Hauler TUS - resumable upload protocol adapter
//!
//! Implements the client side of a TUS-1.0.0-style resumable upload
//! protocol over HTTP and exposes it through the [`IUploadServer`] port
//! defined in `hauler-core`.
//!
//! ## Modules
//!
//! - [`client`] - `TusClient`: HTTP client with base-URL handling and
//!   protocol headers
//! - [`protocol`] - the five wire operations (create, offset, append, delete,
//!   config fetch) with cooperative cancellation
//! - [`metadata`] - `Upload-Metadata` header encoding with non-ASCII fallback
//!
//! [`IUploadServer`]: hauler_core::ports::IUploadServer

pub mod client;
pub mod metadata;
pub mod protocol;

mod provider;

pub use client::TusClient;
