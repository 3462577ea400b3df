//! Sync mappings
//!
//! A [`SyncMapping`] is one unit of work: a local folder, a remote folder,
//! the ignore globs for that pair, and which side is authoritative.
//! Mappings are built from configuration, consumed by a single engine run
//! and then discarded; nothing about them is persisted.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::ignore::IgnoreSet;
use super::newtypes::RemotePath;

/// Which side of a mapping is the source of truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Remote is authoritative; the local tree is made to match it
    Download,
    /// Local is authoritative; the remote tree is made to match it
    Upload,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => write!(f, "download"),
            Direction::Upload => write!(f, "upload"),
        }
    }
}

/// A validated local/remote folder pair
#[derive(Debug, Clone)]
pub struct SyncMapping {
    pub local_root: PathBuf,
    pub remote_root: RemotePath,
    pub ignore: IgnoreSet,
    pub direction: Direction,
}

impl SyncMapping {
    /// Builds a mapping from raw configuration values
    ///
    /// # Errors
    /// Returns `DomainError::InvalidMapping` for blank folders and
    /// `DomainError::InvalidPattern` / `InvalidRemotePath` for bad values.
    pub fn new<S: AsRef<str>>(
        local_folder: &str,
        remote_folder: &str,
        ignore: &[S],
        direction: Direction,
    ) -> Result<Self, DomainError> {
        let local_folder = local_folder.trim();
        let remote_folder = remote_folder.trim();

        if local_folder.is_empty() {
            return Err(DomainError::InvalidMapping(
                "localFolder must not be empty".to_string(),
            ));
        }
        if remote_folder.is_empty() {
            return Err(DomainError::InvalidMapping(format!(
                "remoteFolder must not be empty (localFolder: {local_folder})"
            )));
        }

        Ok(Self {
            local_root: PathBuf::from(local_folder),
            remote_root: RemotePath::new(remote_folder.to_string())?,
            ignore: IgnoreSet::new(ignore)?,
            direction,
        })
    }
}

impl Display for SyncMapping {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Download => {
                write!(f, "{} -> {}", self.remote_root, self.local_root.display())
            }
            Direction::Upload => {
                write!(f, "{} -> {}", self.local_root.display(), self.remote_root)
            }
        }
    }
}
