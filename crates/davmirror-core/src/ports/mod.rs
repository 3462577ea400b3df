//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the reconciliation engine depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ITransport`] - Remote tree operations (WebDAV, in-memory)
//! - [`ILocalFileSystem`] - Local filesystem inspection and mutation

pub mod local_filesystem;
pub mod transport;

pub use local_filesystem::{FileSystemState, ILocalFileSystem};
pub use transport::{ByteStream, ITransport, RemoteEntry, TransportError};
