//! Shared helpers for engine integration tests

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use filetime::FileTime;
use tempfile::TempDir;

use davmirror_core::domain::{IgnoreSet, RemotePath};
use davmirror_sync::filesystem::LocalFileSystemAdapter;
use davmirror_sync::memory::InMemoryTransport;
use davmirror_sync::SyncEngine;

/// A whole-second timestamp, like the ones most servers report
pub const T0: i64 = 1_700_000_000_000;

pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

pub fn rp(s: &str) -> RemotePath {
    RemotePath::new(s.to_string()).unwrap()
}

pub fn no_ignore() -> IgnoreSet {
    IgnoreSet::empty()
}

/// Engine over a fresh temp dir and the given transport
pub struct Harness {
    pub dir: TempDir,
    pub remote: Arc<InMemoryTransport>,
    pub engine: SyncEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_transport(InMemoryTransport::new())
    }

    pub fn with_transport(transport: InMemoryTransport) -> Self {
        let remote = Arc::new(transport);
        let engine = SyncEngine::new(remote.clone(), Arc::new(LocalFileSystemAdapter::new()));
        Self {
            dir: TempDir::new().unwrap(),
            remote,
            engine,
        }
    }

    /// The local mirror root, `<tmp>/mirror`, not created yet
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("mirror")
    }

    pub fn local(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }
}

pub fn write_file(path: &Path, data: &[u8], mtime_ms: i64) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
    set_mtime(path, mtime_ms);
}

pub fn set_mtime(path: &Path, mtime_ms: i64) {
    let secs = mtime_ms.div_euclid(1000);
    let nanos = (mtime_ms.rem_euclid(1000) * 1_000_000) as u32;
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, nanos)).unwrap();
}

pub fn mtime_ms(path: &Path) -> i64 {
    let meta = std::fs::metadata(path).unwrap();
    let ft = FileTime::from_last_modification_time(&meta);
    ft.unix_seconds() * 1000 + i64::from(ft.nanoseconds() / 1_000_000)
}

/// Every path below `root`, relative and sorted, directories with a trailing `/`
pub fn local_tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
            if path.is_dir() {
                out.push(format!("{rel}/"));
                walk(root, &path, out);
            } else {
                out.push(rel);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
