//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: downloads stream into a `<name>.tmp` sibling and are
//!   renamed over the target, so a crash never leaves a half-written file
//!   under the real name. If the rename fails (e.g. across devices on some
//!   bind mounts) the temp file is copied over the target instead. An
//!   existing `<name>.tmp` is never reused; `<name>.1.tmp` etc. is tried next.
//! - **No leftovers**: the temp file is removed on every failure path.
//! - **mtime stamping**: `filetime` on a blocking thread; tokio has no API.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use davmirror_core::{
    domain::ContentHash,
    ports::{
        local_filesystem::{FileSystemState, ILocalFileSystem},
        transport::ByteStream,
    },
};
use filetime::FileTime;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::checksum;

/// Suffix of the transient file a download is streamed into.
pub const TEMP_SUFFIX: &str = ".tmp";

// ============================================================================
// LocalFileSystemAdapter struct
// ============================================================================

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
///
/// This is a zero-sized struct because all operations derive their context
/// from the path arguments.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// `<path>.tmp` in the same directory, so the final rename stays on one
/// filesystem.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut p: OsString = path.as_os_str().to_owned();
    p.push(TEMP_SUFFIX);
    PathBuf::from(p)
}

/// The first of `<path>.tmp`, `<path>.1.tmp`, `<path>.2.tmp`, ... that does
/// not exist yet; a mirrored file may itself be called `<name>.tmp`.
async fn free_temp_sibling(path: &Path) -> PathBuf {
    let mut candidate = temp_sibling(path);
    let mut n = 0u32;
    while tokio::fs::symlink_metadata(&candidate).await.is_ok() {
        n += 1;
        let mut p: OsString = path.as_os_str().to_owned();
        p.push(format!(".{n}{TEMP_SUFFIX}"));
        candidate = PathBuf::from(p);
    }
    candidate
}

fn to_datetime(time: std::time::SystemTime) -> Option<DateTime<Utc>> {
    let dur = time.duration_since(std::time::UNIX_EPOCH).ok()?;
    DateTime::from_timestamp(dur.as_secs() as i64, dur.subsec_nanos())
}

async fn drain_into(path: &Path, mut stream: ByteStream) -> anyhow::Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Rename `tmp` over `target`, copying when the rename is refused.
async fn replace_with(tmp: &Path, target: &Path) -> anyhow::Result<()> {
    match tokio::fs::rename(tmp, target).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(
                target = %target.display(),
                error = %e,
                "Atomic rename failed, falling back to copy"
            );
            tokio::fs::copy(tmp, target).await?;
            tokio::fs::remove_file(tmp).await?;
            Ok(())
        }
    }
}

// ============================================================================
// ILocalFileSystem implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                return Ok(FileSystemState::not_found());
            }
            Err(e) => return Err(e.into()),
        };

        let is_file = metadata.is_file();
        let is_dir = metadata.is_dir();
        let size = if is_file { metadata.len() } else { 0 };
        let modified = metadata.modified().ok().and_then(to_datetime);

        debug!(is_file, is_dir, size, "state retrieved");

        Ok(FileSystemState {
            exists: true,
            is_file,
            is_dir,
            size,
            modified,
        })
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn list_dir(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "Skipping entry with non UTF-8 name"),
            }
        }

        debug!(count = names.len(), "directory listed");
        Ok(names)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(path).await?;
        debug!("directory created");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn remove(&self, path: &Path) -> anyhow::Result<()> {
        // symlink_metadata so a link to a directory removes the link only
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            debug!("removing directory recursively");
            tokio::fs::remove_dir_all(path).await?;
        } else {
            debug!("removing file");
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, stream), fields(path = %path.display()))]
    async fn write_stream(&self, path: &Path, stream: ByteStream) -> anyhow::Result<u64> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = free_temp_sibling(path).await;
        debug!(tmp = %tmp_path.display(), "writing to temporary file");

        let result = async {
            let written = drain_into(&tmp_path, stream).await?;
            replace_with(&tmp_path, path).await?;
            Ok::<u64, anyhow::Error>(written)
        }
        .await;

        match result {
            Ok(written) => {
                debug!(bytes = written, "write complete");
                Ok(written)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                    if cleanup.kind() != ErrorKind::NotFound {
                        warn!(
                            tmp = %tmp_path.display(),
                            error = %cleanup,
                            "Cannot remove temporary file"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        let data = tokio::fs::read(path).await?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    async fn compute_hash(&self, path: &Path) -> Option<ContentHash> {
        checksum::hash_file(path).await
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> anyhow::Result<()> {
        let owned = path.to_path_buf();
        let mtime =
            FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos());
        tokio::task::spawn_blocking(move || filetime::set_file_mtime(&owned, mtime)).await??;
        debug!(%modified, "mtime set");
        Ok(())
    }
}

// ============================================================================
// Unit tests
// ============================================================================
