//! File source port (driven/secondary port)
//!
//! Abstracts where upload bytes come from. The engine never reads a file
//! wholesale: chunks are sliced on demand via [`IFileSource::read_range`],
//! so arbitrarily large files transfer with bounded memory.

/// Port trait for ranged access to a file's bytes
#[async_trait::async_trait]
pub trait IFileSource: Send + Sync {
    /// Original file name (used for wire metadata and display)
    fn file_name(&self) -> &str;

    /// Total length in bytes
    fn len(&self) -> u64;

    /// Returns true for a zero-byte file
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of this file relative to the enqueued root, including the file
    /// name (e.g. `photos/2024/img.jpg`), when the caller uploaded a folder.
    /// `None` for single-file uploads; the engine then targets the base path.
    fn relative_path(&self) -> Option<&str>;

    /// Reads exactly `len` bytes starting at `offset`
    ///
    /// Callers guarantee `offset + len <= self.len()`; implementations
    /// should fail rather than return a short read.
    async fn read_range(&self, offset: u64, len: u64) -> anyhow::Result<Vec<u8>>;
}
