//! Integration tests for davmirror-sync
//!
//! Drives the engine end to end against a real temporary directory and the
//! in-memory transport, checking the mirrored tree after every run.

mod common;

mod test_download;
