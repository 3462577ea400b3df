//! Remote transport port (driven/secondary port)
//!
//! This module defines the interface the reconciliation engine uses to
//! reach the remote tree. The production implementation speaks WebDAV;
//! an in-memory implementation backs the engine tests.
//!
//! ## Design Notes
//!
//! - Errors are classified with [`TransportError`] so the engine can tell
//!   a failed listing (fatal for a mapping) from a failed transfer (fatal
//!   for a single entry).
//! - Uses `#[async_trait]` for async trait methods.
//! - [`RemoteEntry`] is a port-level DTO describing one direct child of a
//!   listed directory.

use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::{ContentHash, RemotePath};

// ============================================================================
// RemoteEntry
// ============================================================================

/// A single direct child of a remote directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Base name, already decoded
    pub name: String,
    /// Whether this entry is a collection
    pub is_directory: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification time, when the server reports one
    pub modified: Option<DateTime<Utc>>,
    /// Advisory MD5 supplied by the server out of band
    pub content_hash: Option<ContentHash>,
}

impl RemoteEntry {
    /// A regular file entry without hash
    pub fn file(name: impl Into<String>, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            size,
            modified,
            content_hash: None,
        }
    }

    /// A directory entry
    pub fn directory(name: impl Into<String>, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            size: 0,
            modified,
            content_hash: None,
        }
    }

    #[must_use]
    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.content_hash = Some(hash);
        self
    }

    /// Modification time in epoch milliseconds; unknown counts as 0
    pub fn modified_millis(&self) -> i64 {
        self.modified.map_or(0, |m| m.timestamp_millis())
    }
}

// ============================================================================
// TransportError
// ============================================================================

/// Errors reported by a transport implementation
#[derive(Debug, Error)]
pub enum TransportError {
    /// A directory could not be listed (missing, not a directory, denied)
    #[error("Cannot list {path}: {reason}")]
    List { path: String, reason: String },

    /// Bytes could not be fetched or stored
    #[error("Transfer failed for {path}: {reason}")]
    Transfer { path: String, reason: String },

    /// The addressed entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other remote operation (mkdir, delete, move, copy) failed
    #[error("{operation} failed for {path}: {reason}")]
    Operation {
        operation: &'static str,
        path: String,
        reason: String,
    },
}

impl TransportError {
    pub fn list(path: &RemotePath, reason: impl ToString) -> Self {
        Self::List {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn transfer(path: &RemotePath, reason: impl ToString) -> Self {
        Self::Transfer {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn operation(operation: &'static str, path: &RemotePath, reason: impl ToString) -> Self {
        Self::Operation {
            operation,
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Stream of downloaded byte chunks
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

// ============================================================================
// ITransport trait
// ============================================================================

/// Port trait for remote tree operations
///
/// ## Implementation Notes
///
/// - `list` returns direct children only, never the listed directory itself.
/// - `create_directory` is idempotent: an existing directory is success.
/// - `delete` is only ever called bottom-up by the engine, so implementations
///   need not support deleting non-empty collections.
/// - `move_item` and `copy_item` are optional capabilities; the reconciliation
///   paths never call them.
/// - No operation retries on its own.
#[async_trait::async_trait]
pub trait ITransport: Send + Sync {
    /// Lists the direct children of a remote directory
    async fn list(&self, path: &RemotePath) -> Result<Vec<RemoteEntry>, TransportError>;

    /// Returns true if anything exists at `path`
    async fn exists(&self, path: &RemotePath) -> Result<bool, TransportError>;

    /// Creates a single directory level
    async fn create_directory(&self, path: &RemotePath) -> Result<(), TransportError>;

    /// Opens a byte stream over a remote file
    async fn download(&self, path: &RemotePath) -> Result<ByteStream, TransportError>;

    /// Stores `data` at `path`, replacing any existing file
    ///
    /// `modified` is a hint; servers that honor it set the stored mtime.
    async fn upload(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        modified: Option<DateTime<Utc>>,
    ) -> Result<(), TransportError>;

    /// Deletes a file or an empty directory
    async fn delete(&self, path: &RemotePath) -> Result<(), TransportError>;

    /// Moves an entry, overwriting the destination
    async fn move_item(&self, from: &RemotePath, to: &RemotePath) -> Result<(), TransportError>;

    /// Copies an entry, overwriting the destination
    async fn copy_item(&self, from: &RemotePath, to: &RemotePath) -> Result<(), TransportError>;

    /// Releases connections; further calls are unspecified
    async fn close(&self) -> Result<(), TransportError>;
}
