//! Domain entities and value types
//!
//! Pure business logic: validated newtypes, the per-file upload record and
//! its status machine, and progress/speed derivation. No I/O happens here.

pub mod errors;
pub mod newtypes;
pub mod progress;
pub mod record;

pub use errors::DomainError;
pub use newtypes::{FileId, TargetPath, UploadHandle};
pub use progress::{ProgressEntry, SpeedEstimator};
pub use record::{UploadRecord, UploadStatus};
