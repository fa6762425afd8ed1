//! Port definitions (trait interfaces for adapters)
//!
//! Ports decouple the engine from concrete adapters:
//! - [`upload_server`] - the remote resumable-upload protocol (driven port)
//! - [`file_source`] - ranged access to local file bytes (driven port)
//! - [`observer`] - progress notification sinks (driving port)

pub mod file_source;
pub mod observer;
pub mod upload_server;

pub use file_source::IFileSource;
pub use observer::IProgressObserver;
pub use upload_server::{IUploadServer, ProtocolError, RemoteTransferConfig};
