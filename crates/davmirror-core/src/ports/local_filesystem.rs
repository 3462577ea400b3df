//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface the reconciliation engine uses to
//! inspect and modify the local tree.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - Paths are plain `std::path::Path` values; mapping roots may be relative
//!   to the working directory.
//! - `write_stream` must never leave a partially written target behind.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::newtypes::ContentHash;
use crate::ports::transport::ByteStream;

// ============================================================================
// FileSystemState struct
// ============================================================================

/// Snapshot of a path's state on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemState {
    /// Whether anything exists at the path
    pub exists: bool,
    /// Regular file (symlinks are followed)
    pub is_file: bool,
    /// Directory (symlinks are followed)
    pub is_dir: bool,
    /// Size in bytes (0 for directories or non-existent paths)
    pub size: u64,
    /// Last modification time (None if not available or path doesn't exist)
    pub modified: Option<DateTime<Utc>>,
}

impl FileSystemState {
    /// Returns a state representing a non-existent path
    pub fn not_found() -> Self {
        Self {
            exists: false,
            is_file: false,
            is_dir: false,
            size: 0,
            modified: None,
        }
    }

    /// Returns true if the path exists and is a regular file
    pub fn is_regular_file(&self) -> bool {
        self.exists && self.is_file
    }

    /// Returns true if the path exists and is a directory
    pub fn is_directory(&self) -> bool {
        self.exists && self.is_dir
    }

    /// Modification time in epoch milliseconds; unknown counts as 0
    pub fn modified_millis(&self) -> i64 {
        self.modified.map_or(0, |m| m.timestamp_millis())
    }
}

// ============================================================================
// ILocalFileSystem trait
// ============================================================================

/// Port trait for local filesystem operations
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Gets the current state of a file or directory
    ///
    /// Returns `FileSystemState::not_found()` if the path doesn't exist
    /// (does not return an error for missing paths).
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState>;

    /// Lists the names of the direct children of a directory
    async fn list_dir(&self, path: &Path) -> anyhow::Result<Vec<String>>;

    /// Creates a directory and all parent directories as needed
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()>;

    /// Removes a file, or a directory with all of its contents
    ///
    /// Removing a path that does not exist is not an error.
    async fn remove(&self, path: &Path) -> anyhow::Result<()>;

    /// Drains `stream` into `path` through a `<name>.tmp` sibling
    ///
    /// The temporary file is renamed over the target once complete and is
    /// removed on failure. Returns the number of bytes written.
    async fn write_stream(&self, path: &Path, stream: ByteStream) -> anyhow::Result<u64>;

    /// Reads the entire contents of a file
    async fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>>;

    /// Computes the MD5 of a file
    ///
    /// Returns `None` if the file is missing or unreadable; callers fall
    /// back to size and mtime comparison.
    async fn compute_hash(&self, path: &Path) -> Option<ContentHash>;

    /// Sets the modification time of a file
    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> anyhow::Result<()>;
}
