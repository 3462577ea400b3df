//! davmirror Sync - one-way folder reconciliation
//!
//! Provides:
//! - Download sync (remote authoritative) and upload sync (local authoritative)
//! - Change detection on size, mtime and advisory MD5
//! - Crash-safe local materialization through `.tmp` siblings
//!
//! ## Modules
//!
//! - [`engine`] - Recursive tree diff and transfer driver
//! - [`filesystem`] - Local filesystem adapter (atomic writes, mtime stamping)
//! - [`checksum`] - MD5 content hashing
//! - [`memory`] - In-memory transport for tests and dry runs

pub mod checksum;
pub mod engine;
pub mod filesystem;
pub mod memory;

use std::path::PathBuf;

use davmirror_core::ports::transport::TransportError;
use thiserror::Error;

pub use engine::{EntryFailure, EntryOperation, MappingOutcome, SyncEngine, SyncReport};

/// Errors that abort a directory level of a sync run
///
/// At a mapping root these end the mapping; below the root the parent
/// records them as an [`EntryFailure`] and moves on to the next sibling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A local directory could not be inspected or created
    #[error("Cannot prepare local directory {path}: {reason}")]
    LocalDirectory { path: PathBuf, reason: String },

    /// A local directory could not be listed
    #[error("Cannot list local directory {path}: {reason}")]
    LocalList { path: PathBuf, reason: String },

    /// A remote directory could not be checked or created
    #[error("Cannot prepare remote directory {path}: {source}")]
    RemoteDirectory {
        path: String,
        #[source]
        source: TransportError,
    },

    /// A remote directory could not be listed
    #[error("Cannot list remote directory {path}: {source}")]
    RemoteList {
        path: String,
        #[source]
        source: TransportError,
    },
}

impl SyncError {
    pub(crate) fn local_directory(path: &std::path::Path, err: anyhow::Error) -> Self {
        Self::LocalDirectory {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn local_list(path: &std::path::Path, err: anyhow::Error) -> Self {
        Self::LocalList {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        }
    }
}
