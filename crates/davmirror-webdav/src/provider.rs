//! WebDavTransport - ITransport implementation over WebDAV
//!
//! Wraps the [`WebDavClient`] and maps [`WebDavError`] into the port-level
//! [`TransportError`] classification the engine relies on.
//!
//! ## Design Notes
//!
//! - No retries and no rate limiting; a failed request fails the operation.
//! - Downloads stream the response body chunk by chunk.
//! - `close` only logs: `reqwest` releases pooled connections on drop.

use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt};
use tracing::debug;

use davmirror_core::domain::RemotePath;
use davmirror_core::ports::transport::{ByteStream, ITransport, RemoteEntry, TransportError};

use crate::client::WebDavClient;
use crate::WebDavError;

/// Remote tree served by a WebDAV server
pub struct WebDavTransport {
    client: WebDavClient,
}

impl WebDavTransport {
    pub fn new(client: WebDavClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &WebDavClient {
        &self.client
    }
}

fn not_found_or(
    path: &RemotePath,
    err: WebDavError,
    other: impl FnOnce(WebDavError) -> TransportError,
) -> TransportError {
    if err.is_not_found() {
        TransportError::NotFound(path.to_string())
    } else {
        other(err)
    }
}

#[async_trait::async_trait]
impl ITransport for WebDavTransport {
    async fn list(&self, path: &RemotePath) -> Result<Vec<RemoteEntry>, TransportError> {
        debug!(path = %path, "WebDavTransport::list");
        self.client
            .list(path)
            .await
            .map_err(|e| TransportError::list(path, e))
    }

    async fn exists(&self, path: &RemotePath) -> Result<bool, TransportError> {
        self.client
            .exists(path)
            .await
            .map_err(|e| TransportError::operation("PROPFIND", path, e))
    }

    async fn create_directory(&self, path: &RemotePath) -> Result<(), TransportError> {
        debug!(path = %path, "WebDavTransport::create_directory");
        self.client
            .mkcol(path)
            .await
            .map_err(|e| TransportError::operation("MKCOL", path, e))
    }

    async fn download(&self, path: &RemotePath) -> Result<ByteStream, TransportError> {
        debug!(path = %path, "WebDavTransport::download");
        let response = self
            .client
            .get(path)
            .await
            .map_err(|e| not_found_or(path, e, |e| TransportError::transfer(path, e)))?;

        let owned = path.clone();
        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(move |e| TransportError::transfer(&owned, e))
            .boxed())
    }

    async fn upload(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        modified: Option<DateTime<Utc>>,
    ) -> Result<(), TransportError> {
        debug!(path = %path, size = data.len(), "WebDavTransport::upload");
        self.client
            .put(path, data, modified)
            .await
            .map_err(|e| TransportError::transfer(path, e))
    }

    async fn delete(&self, path: &RemotePath) -> Result<(), TransportError> {
        debug!(path = %path, "WebDavTransport::delete");
        self.client
            .delete(path)
            .await
            .map_err(|e| not_found_or(path, e, |e| TransportError::operation("DELETE", path, e)))
    }

    async fn move_item(&self, from: &RemotePath, to: &RemotePath) -> Result<(), TransportError> {
        debug!(from = %from, to = %to, "WebDavTransport::move_item");
        self.client
            .move_to(from, to)
            .await
            .map_err(|e| not_found_or(from, e, |e| TransportError::operation("MOVE", from, e)))
    }

    async fn copy_item(&self, from: &RemotePath, to: &RemotePath) -> Result<(), TransportError> {
        debug!(from = %from, to = %to, "WebDavTransport::copy_item");
        self.client
            .copy_to(from, to)
            .await
            .map_err(|e| not_found_or(from, e, |e| TransportError::operation("COPY", from, e)))
    }

    async fn close(&self) -> Result<(), TransportError> {
        debug!(base = %self.client.base_url(), "WebDavTransport::close");
        Ok(())
    }
}
