//! File source adapters
//!
//! Implements the [`IFileSource`] port for local files (ranged reads via
//! seek, bounded memory regardless of file size) and for in-memory byte
//! buffers (small payloads and tests).

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use hauler_core::ports::file_source::IFileSource;

use crate::EngineError;

// ============================================================================
// LocalFileSource
// ============================================================================

/// A file on the local filesystem, read in slices on demand
///
/// The file is re-opened per read so the source stays `Send + Sync` without
/// interior locking; the OS page cache makes repeated opens cheap.
#[derive(Debug)]
pub struct LocalFileSource {
    path: PathBuf,
    file_name: String,
    relative_path: Option<String>,
    len: u64,
}

impl LocalFileSource {
    /// Opens a single file for upload
    ///
    /// # Arguments
    /// * `path` - Path to a regular file
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(EngineError::NotAFile(path));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EngineError::NotAFile(path.clone()))?;

        Ok(Self {
            path,
            file_name,
            relative_path: None,
            len: metadata.len(),
        })
    }

    /// Opens `root/relative` for a folder upload, remembering the relative
    /// path so the engine preserves the folder structure on the server
    ///
    /// # Arguments
    /// * `root` - The enqueued folder
    /// * `relative` - Path of the file below `root`, e.g. `photos/2024/img.jpg`
    pub async fn open_relative(root: &Path, relative: &str) -> Result<Self, EngineError> {
        let mut source = Self::open(root.join(relative)).await?;
        source.relative_path = Some(relative.replace('\\', "/"));
        Ok(source)
    }

    /// The underlying filesystem path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl IFileSource for LocalFileSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }

    async fn read_range(&self, offset: u64, len: u64) -> anyhow::Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .with_context(|| format!("Failed to seek to {offset} in {}", self.path.display()))?;

        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf).await.with_context(|| {
            format!(
                "Short read at offset {offset} ({len} bytes) in {}",
                self.path.display()
            )
        })?;
        Ok(buf)
    }
}

// ============================================================================
// BytesSource
// ============================================================================

/// An in-memory byte buffer acting as a file source
#[derive(Debug, Clone)]
pub struct BytesSource {
    file_name: String,
    relative_path: Option<String>,
    data: Vec<u8>,
}

impl BytesSource {
    #[must_use]
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            relative_path: None,
            data,
        }
    }

    /// Attaches a relative path for folder-structure preservation
    #[must_use]
    pub fn with_relative_path(mut self, relative: impl Into<String>) -> Self {
        self.relative_path = Some(relative.into());
        self
    }
}

#[async_trait::async_trait]
impl IFileSource for BytesSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }

    async fn read_range(&self, offset: u64, len: u64) -> anyhow::Result<Vec<u8>> {
        let start = offset as usize;
        let end = start
            .checked_add(len as usize)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                anyhow::anyhow!("Range {offset}+{len} out of bounds ({})", self.data.len())
            })?;
        Ok(self.data[start..end].to_vec())
    }
}
