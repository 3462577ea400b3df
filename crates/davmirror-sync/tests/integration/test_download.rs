//! Download direction: the remote tree is authoritative

use davmirror_core::domain::{Direction, IgnoreSet, SyncMapping};
use davmirror_sync::memory::{InMemoryTransport, TransportCall};
use davmirror_sync::{EntryOperation, SyncError};

use crate::common::*;

// ============================================================================
// Mirroring
// ============================================================================

#[tokio::test]
async fn test_download_mirrors_remote_tree() {
    let h = Harness::new();
    h.remote.add_file("/docs/readme.md", b"0123456789", Some(at(T0)));
    h.remote.add_file("/docs/notes/a.txt", b"alpha", Some(at(T0 + 2000)));
    h.remote.add_dir("/docs/empty");

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert_eq!(
        local_tree(&h.root()),
        vec!["empty/", "notes/", "notes/a.txt", "readme.md"]
    );
    assert_eq!(std::fs::read(h.local("readme.md")).unwrap(), b"0123456789");
    assert_eq!(mtime_ms(&h.local("readme.md")), T0);
    assert_eq!(mtime_ms(&h.local("notes/a.txt")), T0 + 2000);

    assert_eq!(report.files_downloaded, 2);
    // root, notes, empty
    assert_eq!(report.directories_created, 3);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_download_second_run_transfers_nothing() {
    let h = Harness::new();
    h.remote.add_file("/docs/readme.md", b"0123456789", Some(at(T0)));
    h.remote.add_file("/docs/notes/a.txt", b"alpha", Some(at(T0)));

    h.engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();
    h.remote.clear_calls();

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert!(report.is_noop());
    assert_eq!(report.files_unchanged, 2);
    assert!(h.remote.mutations().is_empty());
}

#[tokio::test]
async fn test_download_removes_local_extras_and_honors_ignore() {
    let h = Harness::new();
    h.remote.add_file("/docs/keep.txt", b"keep", Some(at(T0)));
    h.remote.add_file("/docs/.DS_Store", b"junk", Some(at(T0)));

    write_file(&h.local("stale.txt"), b"old", T0);
    write_file(&h.local("old/nested/deep.txt"), b"deep", T0);
    write_file(&h.local("local.swp"), b"editor state", T0);

    let ignore = IgnoreSet::new(&[".DS_Store", "*.swp"]).unwrap();
    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &ignore)
        .await
        .unwrap();

    // Ignored names are neither fetched nor deleted
    assert_eq!(local_tree(&h.root()), vec!["keep.txt", "local.swp"]);
    assert_eq!(report.entries_deleted, 2);
    assert!(!h
        .remote
        .calls()
        .contains(&TransportCall::Download("/docs/.DS_Store".into())));
}

#[tokio::test]
async fn test_download_ignore_applies_below_root_and_skips_ignored_dirs() {
    let h = Harness::new();
    h.remote.add_file("/docs/sub/keep.txt", b"keep", Some(at(T0)));
    h.remote.add_file("/docs/sub/skip.log", b"remote log", Some(at(T0)));
    h.remote.add_file("/docs/cache/x.bin", b"remote cache", Some(at(T0)));

    write_file(&h.local("sub/local.log"), b"local log", T0);
    write_file(&h.local("cache/own.bin"), b"local cache", T0);

    let ignore = IgnoreSet::new(&["*.log", "cache"]).unwrap();
    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &ignore)
        .await
        .unwrap();

    assert_eq!(
        local_tree(&h.root()),
        vec!["cache/", "cache/own.bin", "sub/", "sub/keep.txt", "sub/local.log"]
    );
    assert_eq!(std::fs::read(h.local("cache/own.bin")).unwrap(), b"local cache");
    assert_eq!(std::fs::read(h.local("sub/local.log")).unwrap(), b"local log");
    assert_eq!(report.files_downloaded, 1);
    assert_eq!(report.entries_deleted, 0);

    let calls = h.remote.calls();
    assert!(!calls.contains(&TransportCall::List("/docs/cache".into())));
    assert!(!calls.contains(&TransportCall::Download("/docs/cache/x.bin".into())));
    assert!(!calls.contains(&TransportCall::Download("/docs/sub/skip.log".into())));
}

// ============================================================================
// Change detection
// ============================================================================

#[tokio::test]
async fn test_download_mtime_within_tolerance_is_skipped() {
    let h = Harness::new();
    h.remote.add_file("/docs/f.txt", b"remote", Some(at(T0 + 999)));
    write_file(&h.local("f.txt"), b"local!", T0);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert_eq!(report.files_downloaded, 0);
    assert_eq!(std::fs::read(h.local("f.txt")).unwrap(), b"local!");
}

#[tokio::test]
async fn test_download_mtime_beyond_tolerance_is_fetched() {
    let h = Harness::new();
    h.remote.add_file("/docs/f.txt", b"remote", Some(at(T0 + 1001)));
    write_file(&h.local("f.txt"), b"local!", T0);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert_eq!(report.files_downloaded, 1);
    assert_eq!(std::fs::read(h.local("f.txt")).unwrap(), b"remote");
    assert_eq!(mtime_ms(&h.local("f.txt")), T0 + 1001);
}

#[tokio::test]
async fn test_download_size_change_is_fetched_despite_equal_mtime() {
    let h = Harness::new();
    h.remote.add_file("/docs/f.txt", b"longer content", Some(at(T0)));
    write_file(&h.local("f.txt"), b"short", T0);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert_eq!(report.files_downloaded, 1);
    assert_eq!(std::fs::read(h.local("f.txt")).unwrap(), b"longer content");
}

#[tokio::test]
async fn test_download_hash_match_aligns_mtime_without_transfer() {
    let h = Harness::with_transport(InMemoryTransport::new().with_hashes());
    h.remote.add_file("/docs/f.txt", b"same bytes", Some(at(T0)));
    write_file(&h.local("f.txt"), b"same bytes", T0 - 3_600_000);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert_eq!(report.files_downloaded, 0);
    assert_eq!(report.files_unchanged, 1);
    assert!(h.remote.mutations().is_empty());
    assert_eq!(mtime_ms(&h.local("f.txt")), T0);
}

#[tokio::test]
async fn test_download_hash_mismatch_is_fetched() {
    let h = Harness::with_transport(InMemoryTransport::new().with_hashes());
    h.remote.add_file("/docs/f.txt", b"new bytes!", Some(at(T0)));
    write_file(&h.local("f.txt"), b"old bytes!", T0 - 3_600_000);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert_eq!(report.files_downloaded, 1);
    assert_eq!(std::fs::read(h.local("f.txt")).unwrap(), b"new bytes!");
}

// ============================================================================
// Type conflicts
// ============================================================================

#[tokio::test]
async fn test_download_remote_directory_replaces_local_file() {
    let h = Harness::new();
    h.remote.add_file("/docs/x/inner.txt", b"inner", Some(at(T0)));
    write_file(&h.local("x"), b"i am a file", T0);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert!(report.errors.is_empty());
    assert_eq!(local_tree(&h.root()), vec!["x/", "x/inner.txt"]);
}

#[tokio::test]
async fn test_download_remote_file_replaces_local_directory() {
    let h = Harness::new();
    h.remote.add_file("/docs/x", b"now a file", Some(at(T0)));
    write_file(&h.local("x/child/leaf.txt"), b"leaf", T0);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert!(report.errors.is_empty());
    assert_eq!(local_tree(&h.root()), vec!["x"]);
    assert_eq!(std::fs::read(h.local("x")).unwrap(), b"now a file");
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_download_failed_transfer_leaves_no_temp_and_keeps_old_copy() {
    let h = Harness::new();
    h.remote.add_file("/docs/bad.bin", b"0123456789abcdef", Some(at(T0)));
    h.remote.add_file("/docs/good.txt", b"fine", Some(at(T0)));
    h.remote.add_file("/docs/fresh.bin", b"never arrives", Some(at(T0)));
    h.remote.fail_transfers_of("/docs/bad.bin");
    h.remote.fail_transfers_of("/docs/fresh.bin");
    write_file(&h.local("bad.bin"), b"previous", T0 - 60_000);

    let report = h
        .engine
        .sync_from_remote(&h.root(), &rp("/docs"), &no_ignore())
        .await
        .unwrap();

    assert_eq!(report.files_downloaded, 1);
    assert_eq!(report.errors.len(), 2);
    assert!(report
        .errors
        .iter()
        .all(|e| e.operation == EntryOperation::Download));

    assert_eq!(local_tree(&h.root()), vec!["bad.bin", "good.txt"]);
    assert_eq!(std::fs::read(h.local("bad.bin")).unwrap(), b"previous");
}

#[tokio::test]
async fn test_download_missing_remote_root_is_fatal() {
    let h = Harness::new();

    let err = h
        .engine
        .sync_from_remote(&h.root(), &rp("/nope"), &no_ignore())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::RemoteList { .. }));
}

#[tokio::test]
async fn test_download_uncreatable_local_root_is_fatal() {
    let h = Harness::new();
    h.remote.add_file("/docs/a.txt", b"a", Some(at(T0)));
    // The root's parent is a regular file
    let root_parent_file = h.dir.path().join("blocked");
    write_file(&root_parent_file, b"x", T0);

    let err = h
        .engine
        .sync_from_remote(&root_parent_file.join("mirror"), &rp("/docs"), &no_ignore())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::LocalDirectory { .. }));
}

#[tokio::test]
async fn test_run_all_continues_after_failed_mapping() {
    let h = Harness::new();
    h.remote.add_file("/photos/p.jpg", b"jpeg", Some(at(T0)));

    let broken_local = h.dir.path().join("broken");
    let good_local = h.dir.path().join("good");
    let mappings = vec![
        SyncMapping::new(
            broken_local.to_str().unwrap(),
            "/missing",
            &[] as &[&str],
            Direction::Download,
        )
        .unwrap(),
        SyncMapping::new(
            good_local.to_str().unwrap(),
            "/photos",
            &[] as &[&str],
            Direction::Download,
        )
        .unwrap(),
    ];

    let outcomes = h.engine.run_all(mappings).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].result.is_err());
    let report = outcomes[1].result.as_ref().unwrap();
    assert_eq!(report.files_downloaded, 1);
    assert_eq!(std::fs::read(good_local.join("p.jpg")).unwrap(), b"jpeg");
}
