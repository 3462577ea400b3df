//! Folder reconciliation engine
//!
//! The [`SyncEngine`] makes one tree match another, in one direction per run:
//!
//! - **Download** ([`SyncEngine::sync_from_remote`]): the remote tree is
//!   authoritative; local files are fetched, replaced, or deleted.
//! - **Upload** ([`SyncEngine::sync_to_remote`]): the local tree is
//!   authoritative; remote files are stored, replaced, or deleted.
//!
//! ## Traversal
//!
//! Depth-first, one directory level at a time. Each level lists both sides
//! once, processes every non-ignored entry, then deletes what the
//! authoritative side no longer has. Nothing is cached between runs.
//!
//! ## Failure scopes
//!
//! Failing to prepare or list a mapping root is a [`SyncError`] and ends that
//! mapping. Anything below the root (a transfer, a delete, a whole
//! subdirectory) is recorded in [`SyncReport::errors`] and its siblings are
//! still processed. No operation is retried.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use davmirror_core::domain::{Direction, IgnoreSet, RemotePath, SyncMapping};
use davmirror_core::ports::local_filesystem::{FileSystemState, ILocalFileSystem};
use davmirror_core::ports::transport::{ITransport, RemoteEntry, TransportError};

use crate::SyncError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Local and remote mtimes closer than this are equal on the download side.
pub const MTIME_TOLERANCE_MS: i64 = 1000;

// ============================================================================
// SyncReport
// ============================================================================

/// What a single entry failure was doing when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOperation {
    Inspect,
    Download,
    Upload,
    CreateDirectory,
    Delete,
    Descend,
}

impl Display for EntryOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryOperation::Inspect => "inspect",
            EntryOperation::Download => "download",
            EntryOperation::Upload => "upload",
            EntryOperation::CreateDirectory => "create directory",
            EntryOperation::Delete => "delete",
            EntryOperation::Descend => "descend",
        };
        f.write_str(s)
    }
}

/// A non-fatal failure on one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub path: String,
    pub operation: EntryOperation,
    pub message: String,
}

impl Display for EntryFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.path, self.message)
    }
}

/// Summary of one mapping run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Files fetched from the remote side
    pub files_downloaded: u32,
    /// Files stored on the remote side
    pub files_uploaded: u32,
    /// Entries (files or whole trees) removed from the mirrored side
    pub entries_deleted: u32,
    /// Files found unchanged and left alone
    pub files_unchanged: u32,
    /// Directories created on the mirrored side
    pub directories_created: u32,
    /// Failures that did not stop the run
    pub errors: Vec<EntryFailure>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl SyncReport {
    /// Transfers in either direction
    pub fn transfers(&self) -> u32 {
        self.files_downloaded + self.files_uploaded
    }

    /// True when the run changed nothing on the mirrored side
    pub fn is_noop(&self) -> bool {
        self.transfers() == 0 && self.entries_deleted == 0 && self.directories_created == 0
    }

    fn record(&mut self, path: impl Display, operation: EntryOperation, err: impl Display) {
        let failure = EntryFailure {
            path: path.to_string(),
            operation,
            message: err.to_string(),
        };
        warn!(
            path = %failure.path,
            operation = %failure.operation,
            error = %failure.message,
            "Entry failed, continuing"
        );
        self.errors.push(failure);
    }
}

/// Result of one mapping in [`SyncEngine::run_all`]
#[derive(Debug)]
pub struct MappingOutcome {
    pub mapping: SyncMapping,
    pub result: Result<SyncReport, SyncError>,
}

// ============================================================================
// Change detection
// ============================================================================

/// Verdict of comparing a local file with its remote peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Metadata says the files are the same
    Unchanged,
    /// Metadata says the files differ and no hash can overrule it
    Changed,
    /// Sizes match but mtimes disagree; compare the remote hash
    CheckHash,
}

/// Download rule: equal size and mtimes within [`MTIME_TOLERANCE_MS`].
///
/// A remote without mtime counts as epoch 0, leaving only the hash to
/// prove equality.
pub fn download_freshness(local: &FileSystemState, remote: &RemoteEntry) -> Freshness {
    if local.size != remote.size {
        return Freshness::Changed;
    }
    let delta = (remote.modified_millis() - local.modified_millis()).abs();
    if delta < MTIME_TOLERANCE_MS {
        Freshness::Unchanged
    } else if remote.content_hash.is_some() {
        Freshness::CheckHash
    } else {
        Freshness::Changed
    }
}

/// Upload rule: equal size and exactly equal mtimes (millisecond precision).
///
/// Stricter than [`download_freshness`]; a server that rounds stored mtimes
/// to seconds only avoids re-uploads by publishing hashes.
pub fn upload_freshness(local: &FileSystemState, remote: &RemoteEntry) -> Freshness {
    if local.size != remote.size {
        return Freshness::Changed;
    }
    if local.modified_millis() == remote.modified_millis() {
        Freshness::Unchanged
    } else if remote.content_hash.is_some() {
        Freshness::CheckHash
    } else {
        Freshness::Changed
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// One-way reconciliation between a local and a remote tree
///
/// ## Dependencies
///
/// - `transport`: remote tree operations (WebDAV or in-memory)
/// - `local`: local filesystem inspection, atomic writes, hashing
pub struct SyncEngine {
    transport: Arc<dyn ITransport>,
    local: Arc<dyn ILocalFileSystem>,
}

impl SyncEngine {
    pub fn new(transport: Arc<dyn ITransport>, local: Arc<dyn ILocalFileSystem>) -> Self {
        Self { transport, local }
    }

    /// Runs a mapping in its configured direction
    pub async fn run(&self, mapping: &SyncMapping) -> Result<SyncReport, SyncError> {
        match mapping.direction {
            Direction::Download => {
                self.sync_from_remote(&mapping.local_root, &mapping.remote_root, &mapping.ignore)
                    .await
            }
            Direction::Upload => {
                self.sync_to_remote(&mapping.remote_root, &mapping.local_root, &mapping.ignore)
                    .await
            }
        }
    }

    /// Runs every mapping in order; a fatal error in one does not stop the rest
    pub async fn run_all(&self, mappings: Vec<SyncMapping>) -> Vec<MappingOutcome> {
        let mut outcomes = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let result = self.run(&mapping).await;
            if let Err(ref e) = result {
                error!(mapping = %mapping, error = %e, "Mapping failed");
            }
            outcomes.push(MappingOutcome { mapping, result });
        }
        outcomes
    }

    // ========================================================================
    // Download: remote -> local
    // ========================================================================

    /// Makes `local_root` an exact mirror of `remote_root`
    ///
    /// # Errors
    /// Returns [`SyncError`] if the local root cannot be created or the
    /// remote root cannot be listed.
    #[tracing::instrument(skip_all, fields(local = %local_root.display(), remote = %remote_root))]
    pub async fn sync_from_remote(
        &self,
        local_root: &Path,
        remote_root: &RemotePath,
        ignore: &IgnoreSet,
    ) -> Result<SyncReport, SyncError> {
        let start = std::time::Instant::now();
        let mut report = SyncReport::default();

        info!("Starting download sync");
        self.download_dir(local_root, remote_root, ignore, &mut report)
            .await?;

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            downloaded = report.files_downloaded,
            deleted = report.entries_deleted,
            unchanged = report.files_unchanged,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Download sync complete"
        );
        Ok(report)
    }

    fn download_dir<'a>(
        &'a self,
        local_dir: &'a Path,
        remote_dir: &'a RemotePath,
        ignore: &'a IgnoreSet,
        report: &'a mut SyncReport,
    ) -> BoxFuture<'a, Result<(), SyncError>> {
        Box::pin(async move {
            let state = self
                .local
                .get_state(local_dir)
                .await
                .map_err(|e| SyncError::local_directory(local_dir, e))?;
            if !state.is_directory() {
                self.local
                    .create_directory(local_dir)
                    .await
                    .map_err(|e| SyncError::local_directory(local_dir, e))?;
                report.directories_created += 1;
                debug!(path = %local_dir.display(), "Created local directory");
            }

            let entries = self
                .transport
                .list(remote_dir)
                .await
                .map_err(|source| SyncError::RemoteList {
                    path: remote_dir.to_string(),
                    source,
                })?;

            let mut kept: HashSet<String> = HashSet::with_capacity(entries.len());

            for entry in &entries {
                if ignore.matches(&entry.name) {
                    continue;
                }
                kept.insert(entry.name.clone());

                let local_path = local_dir.join(&entry.name);
                let remote_path = match remote_dir.join(&entry.name) {
                    Ok(p) => p,
                    Err(e) => {
                        report.record(local_path.display(), EntryOperation::Inspect, e);
                        continue;
                    }
                };

                if entry.is_directory {
                    if let Err(e) = self.clear_local_file(&local_path).await {
                        report.record(local_path.display(), EntryOperation::Delete, e);
                        continue;
                    }
                    if let Err(e) = self
                        .download_dir(&local_path, &remote_path, ignore, report)
                        .await
                    {
                        report.record(local_path.display(), EntryOperation::Descend, e);
                    }
                } else {
                    self.download_file(&local_path, &remote_path, entry, report)
                        .await;
                }
            }

            self.prune_local(local_dir, &kept, ignore, report).await
        })
    }

    /// Removes a regular file standing where a remote directory belongs
    async fn clear_local_file(&self, path: &Path) -> anyhow::Result<()> {
        let state = self.local.get_state(path).await?;
        if state.exists && !state.is_directory() {
            info!(path = %path.display(), "Replacing local file with remote directory");
            self.local.remove(path).await?;
        }
        Ok(())
    }

    async fn download_file(
        &self,
        local_path: &Path,
        remote_path: &RemotePath,
        entry: &RemoteEntry,
        report: &mut SyncReport,
    ) {
        let fetch = match self.local.get_state(local_path).await {
            Ok(state) if state.is_directory() => {
                info!(path = %local_path.display(), "Replacing local directory with remote file");
                if let Err(e) = self.local.remove(local_path).await {
                    report.record(local_path.display(), EntryOperation::Delete, e);
                    return;
                }
                true
            }
            Ok(state) if !state.exists => true,
            Ok(state) => match download_freshness(&state, entry) {
                Freshness::Unchanged => false,
                Freshness::Changed => true,
                Freshness::CheckHash => !self.hash_confirms(local_path, entry).await,
            },
            Err(e) => {
                warn!(path = %local_path.display(), error = %e, "Cannot inspect local file, fetching");
                true
            }
        };

        if !fetch {
            trace!(path = %local_path.display(), "Unchanged");
            report.files_unchanged += 1;
            return;
        }

        match self.fetch(local_path, remote_path, entry).await {
            Ok(bytes) => {
                info!(path = %remote_path, bytes, "Downloaded");
                report.files_downloaded += 1;
            }
            Err(e) => report.record(remote_path, EntryOperation::Download, format!("{e:#}")),
        }
    }

    /// True when the local content matches the remote hash
    ///
    /// On a match the local mtime is moved to the remote's so the next run
    /// settles on metadata alone.
    async fn hash_confirms(&self, local_path: &Path, entry: &RemoteEntry) -> bool {
        let Some(local_hash) = self.local.compute_hash(local_path).await else {
            return false;
        };
        if entry.content_hash.as_ref() != Some(&local_hash) {
            debug!(path = %local_path.display(), "Content hash differs");
            return false;
        }

        if let Some(modified) = entry.modified {
            if let Err(e) = self.local.set_modified(local_path, modified).await {
                warn!(path = %local_path.display(), error = %e, "Cannot align mtime after hash match");
                return false;
            }
        }
        debug!(path = %local_path.display(), "Content hash matches, mtime aligned");
        true
    }

    async fn fetch(
        &self,
        local_path: &Path,
        remote_path: &RemotePath,
        entry: &RemoteEntry,
    ) -> anyhow::Result<u64> {
        let stream = self.transport.download(remote_path).await?;
        let written = self.local.write_stream(local_path, stream).await?;
        if let Some(modified) = entry.modified {
            self.local.set_modified(local_path, modified).await?;
        }
        Ok(written)
    }

    async fn prune_local(
        &self,
        local_dir: &Path,
        kept: &HashSet<String>,
        ignore: &IgnoreSet,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let names = self
            .local
            .list_dir(local_dir)
            .await
            .map_err(|e| SyncError::local_list(local_dir, e))?;

        for name in names {
            if kept.contains(&name) || ignore.matches(&name) {
                continue;
            }
            let path = local_dir.join(&name);
            match self.local.remove(&path).await {
                Ok(()) => {
                    info!(path = %path.display(), "Deleted local entry absent from remote");
                    report.entries_deleted += 1;
                }
                Err(e) => report.record(path.display(), EntryOperation::Delete, e),
            }
        }
        Ok(())
    }

    // ========================================================================
    // Upload: local -> remote
    // ========================================================================

    /// Makes `remote_root` an exact mirror of `local_root`
    ///
    /// A missing `local_root` removes the whole remote subtree.
    ///
    /// # Errors
    /// Returns [`SyncError`] if the remote root cannot be created or listed,
    /// or the local root cannot be listed.
    #[tracing::instrument(skip_all, fields(local = %local_root.display(), remote = %remote_root))]
    pub async fn sync_to_remote(
        &self,
        remote_root: &RemotePath,
        local_root: &Path,
        ignore: &IgnoreSet,
    ) -> Result<SyncReport, SyncError> {
        let start = std::time::Instant::now();
        let mut report = SyncReport::default();

        info!("Starting upload sync");
        let root_state = self
            .local
            .get_state(local_root)
            .await
            .map_err(|e| SyncError::local_directory(local_root, e))?;

        if root_state.exists && !root_state.is_directory() {
            return Err(SyncError::LocalDirectory {
                path: local_root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        if root_state.exists {
            self.upload_dir(local_root, remote_root, ignore, false, &mut report)
                .await?;
        } else {
            warn!("Local root does not exist, removing remote subtree");
            match self.transport.exists(remote_root).await {
                Ok(true) => match self.delete_remote_tree(remote_root, true).await {
                    Ok(()) => report.entries_deleted += 1,
                    Err(e) => report.record(remote_root, EntryOperation::Delete, e),
                },
                Ok(false) => debug!("Remote root absent as well"),
                Err(e) => report.record(remote_root, EntryOperation::Inspect, e),
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            uploaded = report.files_uploaded,
            deleted = report.entries_deleted,
            unchanged = report.files_unchanged,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Upload sync complete"
        );
        Ok(report)
    }

    fn upload_dir<'a>(
        &'a self,
        local_dir: &'a Path,
        remote_dir: &'a RemotePath,
        ignore: &'a IgnoreSet,
        remote_known: bool,
        report: &'a mut SyncReport,
    ) -> BoxFuture<'a, Result<(), SyncError>> {
        Box::pin(async move {
            if !remote_known {
                self.ensure_remote_dir(remote_dir, report).await?;
            }

            let remote: HashMap<String, RemoteEntry> = self
                .transport
                .list(remote_dir)
                .await
                .map_err(|source| SyncError::RemoteList {
                    path: remote_dir.to_string(),
                    source,
                })?
                .into_iter()
                .map(|e| (e.name.clone(), e))
                .collect();

            let names = self
                .local
                .list_dir(local_dir)
                .await
                .map_err(|e| SyncError::local_list(local_dir, e))?;

            for name in names {
                if ignore.matches(&name) {
                    continue;
                }

                let local_path = local_dir.join(&name);
                let remote_path = match remote_dir.join(&name) {
                    Ok(p) => p,
                    Err(e) => {
                        report.record(local_path.display(), EntryOperation::Inspect, e);
                        continue;
                    }
                };
                let state = match self.local.get_state(&local_path).await {
                    Ok(s) => s,
                    Err(e) => {
                        report.record(local_path.display(), EntryOperation::Inspect, e);
                        continue;
                    }
                };
                let peer = remote.get(&name);

                if state.is_directory() {
                    let peer_is_dir = peer.is_some_and(|p| p.is_directory);
                    if peer.is_some_and(|p| !p.is_directory) {
                        info!(path = %remote_path, "Replacing remote file with local directory");
                        if let Err(e) = self.transport.delete(&remote_path).await {
                            report.record(&remote_path, EntryOperation::Delete, e);
                            continue;
                        }
                    }
                    if let Err(e) = self
                        .upload_dir(&local_path, &remote_path, ignore, peer_is_dir, report)
                        .await
                    {
                        report.record(&remote_path, EntryOperation::Descend, e);
                    }
                } else if state.is_regular_file() {
                    self.upload_file(&local_path, &remote_path, &state, peer, report)
                        .await;
                } else {
                    debug!(path = %local_path.display(), "Skipping special file");
                }
            }

            self.prune_remote(local_dir, remote_dir, &remote, ignore, report)
                .await;
            Ok(())
        })
    }

    async fn ensure_remote_dir(
        &self,
        remote_dir: &RemotePath,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let fail = |source| SyncError::RemoteDirectory {
            path: remote_dir.to_string(),
            source,
        };

        if !self.transport.exists(remote_dir).await.map_err(fail)? {
            self.transport
                .create_directory(remote_dir)
                .await
                .map_err(fail)?;
            report.directories_created += 1;
            debug!(path = %remote_dir, "Created remote directory");
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        remote_path: &RemotePath,
        state: &FileSystemState,
        peer: Option<&RemoteEntry>,
        report: &mut SyncReport,
    ) {
        let upload = match peer {
            None => true,
            Some(p) if p.is_directory => {
                info!(path = %remote_path, "Replacing remote directory with local file");
                if let Err(e) = self.delete_remote_tree(remote_path, true).await {
                    report.record(remote_path, EntryOperation::Delete, e);
                    return;
                }
                true
            }
            Some(p) => match upload_freshness(state, p) {
                Freshness::Unchanged => false,
                Freshness::Changed => true,
                Freshness::CheckHash => !self.hash_confirms(local_path, p).await,
            },
        };

        if !upload {
            trace!(path = %local_path.display(), "Unchanged");
            report.files_unchanged += 1;
            return;
        }

        match self.put(local_path, remote_path, state).await {
            Ok(bytes) => {
                info!(path = %remote_path, bytes, "Uploaded");
                report.files_uploaded += 1;
            }
            Err(e) => report.record(remote_path, EntryOperation::Upload, format!("{e:#}")),
        }
    }

    async fn put(
        &self,
        local_path: &Path,
        remote_path: &RemotePath,
        state: &FileSystemState,
    ) -> anyhow::Result<usize> {
        let data = self.local.read_file(local_path).await?;
        let len = data.len();
        self.transport
            .upload(remote_path, data, state.modified)
            .await?;
        Ok(len)
    }

    async fn prune_remote(
        &self,
        local_dir: &Path,
        remote_dir: &RemotePath,
        remote: &HashMap<String, RemoteEntry>,
        ignore: &IgnoreSet,
        report: &mut SyncReport,
    ) {
        for (name, entry) in remote {
            if ignore.matches(name) {
                continue;
            }
            let local_path = local_dir.join(name);
            match self.local.get_state(&local_path).await {
                Ok(state) if state.exists => continue,
                Ok(_) => {}
                Err(e) => {
                    // Unknown local state; never delete on a guess
                    report.record(local_path.display(), EntryOperation::Inspect, e);
                    continue;
                }
            }

            let remote_path = match remote_dir.join(name) {
                Ok(p) => p,
                Err(e) => {
                    report.record(remote_dir, EntryOperation::Inspect, e);
                    continue;
                }
            };
            match self.delete_remote_tree(&remote_path, entry.is_directory).await {
                Ok(()) => {
                    info!(path = %remote_path, "Deleted remote entry absent locally");
                    report.entries_deleted += 1;
                }
                Err(e) => report.record(&remote_path, EntryOperation::Delete, e),
            }
        }
    }

    /// Deletes a remote entry bottom-up
    ///
    /// Children that fail to delete are logged; the final delete of `path`
    /// then reports the failure for the whole subtree.
    fn delete_remote_tree<'a>(
        &'a self,
        path: &'a RemotePath,
        is_directory: bool,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            if is_directory {
                match self.transport.list(path).await {
                    Ok(children) => {
                        for child in children {
                            let child_path = match path.join(&child.name) {
                                Ok(p) => p,
                                Err(e) => {
                                    warn!(parent = %path, name = %child.name, error = %e, "Skipping invalid child name");
                                    continue;
                                }
                            };
                            if let Err(e) = self
                                .delete_remote_tree(&child_path, child.is_directory)
                                .await
                            {
                                warn!(path = %child_path, error = %e, "Cannot delete remote child");
                            }
                        }
                    }
                    Err(e) => debug!(path = %path, error = %e, "Cannot list before delete"),
                }
            }
            self.transport.delete(path).await
        })
    }
}

// ============================================================================
// Unit tests
// ============================================================================
