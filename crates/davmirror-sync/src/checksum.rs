//! Content hashing
//!
//! MD5 is what ownCloud-family servers publish in `oc:checksums`, so it is
//! what the local side has to compute to compare without downloading.

use std::path::Path;

use davmirror_core::domain::ContentHash;
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Read buffer size for streaming a file through the hasher.
const BUFFER_SIZE: usize = 8 * 1024;

/// Hash a local file, or `None` if it cannot be read.
///
/// Absence is not an error: callers fall back to size/mtime comparison.
pub async fn hash_file(path: &Path) -> Option<ContentHash> {
    match try_hash_file(path).await {
        Ok(hash) => {
            debug!(path = %path.display(), %hash, "hash computed");
            Some(hash)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot hash file");
            None
        }
    }
}

async fn try_hash_file(path: &Path) -> std::io::Result<ContentHash> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(ContentHash::from_digest(hasher.finalize().into()))
}

/// Hash an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::from_digest(Md5::digest(data).into())
}
