//! WebDAV HTTP client
//!
//! Thin typed layer over `reqwest`: builds collection URLs from a base URL and
//! a [`RemotePath`], attaches Basic credentials, and classifies statuses into
//! [`WebDavError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use davmirror_core::domain::RemotePath;
//! use davmirror_webdav::client::WebDavClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = WebDavClient::new(
//!     "https://cloud.example.com/remote.php/dav/files/alice/",
//!     "alice",
//!     "secret",
//! )?;
//! let entries = client.list(&RemotePath::new("/docs".into())?).await?;
//! println!("{} entries", entries.len());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use davmirror_core::config::ServerConfig;
use davmirror_core::domain::RemotePath;
use davmirror_core::ports::transport::RemoteEntry;

use crate::multistatus::{self, DavResource, PROPFIND_BODY};
use crate::WebDavError;

/// Header ownCloud and Nextcloud read to set the stored mtime on `PUT`
pub const MTIME_HEADER: &str = "X-OC-Mtime";

/// `Depth` header values used by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

impl Depth {
    fn as_header(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
        }
    }
}

fn dav_method(name: &'static [u8]) -> Method {
    // Token characters only, so construction cannot fail
    Method::from_bytes(name).unwrap_or(Method::GET)
}

// ============================================================================
// WebDavClient
// ============================================================================

/// HTTP client for one WebDAV root
pub struct WebDavClient {
    client: Client,
    /// Always ends with `/`
    base_url: Url,
    username: String,
    password: String,
}

impl WebDavClient {
    /// Creates a client for the collection at `base_url`
    ///
    /// # Errors
    /// Returns `WebDavError::InvalidUrl` when `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, WebDavError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| WebDavError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(WebDavError::InvalidUrl(format!(
                "{base_url}: expected an http(s) collection URL"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(concat!("davmirror/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Creates a client from the `server` configuration section
    ///
    /// # Errors
    /// Returns `WebDavError::MissingCredentials` when no password is
    /// configured or set in the environment.
    pub fn from_config(server: &ServerConfig) -> Result<Self, WebDavError> {
        let password = server.effective_password().ok_or_else(|| {
            WebDavError::MissingCredentials(format!(
                "no password for {} (set server.password or {})",
                server.username,
                davmirror_core::config::PASSWORD_ENV
            ))
        })?;
        Self::new(&server.url, server.username.clone(), password)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a remote path; the root keeps its trailing slash
    ///
    /// # Errors
    /// Returns `WebDavError::InvalidUrl` if the base URL cannot take segments.
    pub fn url_for(&self, path: &RemotePath) -> Result<Url, WebDavError> {
        let mut url = self.base_url.clone();
        if path.is_root() {
            return Ok(url);
        }
        url.path_segments_mut()
            .map_err(|()| WebDavError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path.segments());
        Ok(url)
    }

    /// Creates an authenticated request builder
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &Url,
        accept: &[StatusCode],
    ) -> Result<Response, WebDavError> {
        let response = request.send().await?;
        let status = response.status();
        if accept.contains(&status) || (accept.is_empty() && status.is_success()) {
            Ok(response)
        } else {
            debug!(%url, %status, "Rejected status");
            Err(WebDavError::from_status(status, url))
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Raw `PROPFIND` for `path`
    pub async fn propfind(
        &self,
        path: &RemotePath,
        depth: Depth,
    ) -> Result<Vec<DavResource>, WebDavError> {
        let url = self.url_for(path)?;
        debug!(%url, depth = depth.as_header(), "PROPFIND");

        let request = self
            .request(dav_method(b"PROPFIND"), url.clone())
            .header("Depth", depth.as_header())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            )
            .body(PROPFIND_BODY);
        let response = self
            .send(request, &url, &[StatusCode::MULTI_STATUS])
            .await?;

        let body = response.text().await?;
        multistatus::parse(&body)
    }

    /// Direct children of the collection at `path`
    ///
    /// The response describing `path` itself is dropped: the one whose href
    /// matches the request URL, or the first one if none does.
    pub async fn list(&self, path: &RemotePath) -> Result<Vec<RemoteEntry>, WebDavError> {
        let url = self.url_for(path)?;
        let mut resources = self.propfind(path, Depth::One).await?;

        let own_path = multistatus::decoded_href_path(url.as_str());
        let self_index = resources
            .iter()
            .position(|r| r.decoded_path().is_some() && r.decoded_path() == own_path)
            .or_else(|| (!resources.is_empty()).then_some(0));
        if let Some(i) = self_index {
            let own = resources.remove(i);
            if !own.is_collection {
                warn!(path = %path, "Listed resource is not a collection");
                return Err(WebDavError::InvalidResponse(format!("{path} is not a collection")));
            }
        }

        let entries: Vec<RemoteEntry> = resources
            .into_iter()
            .filter_map(DavResource::into_entry)
            .collect();
        debug!(path = %path, count = entries.len(), "Listed");
        Ok(entries)
    }

    /// `PROPFIND Depth: 0`; 404 is `false`
    pub async fn exists(&self, path: &RemotePath) -> Result<bool, WebDavError> {
        match self.propfind(path, Depth::Zero).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `GET`, returning the response so the body can be streamed
    pub async fn get(&self, path: &RemotePath) -> Result<Response, WebDavError> {
        let url = self.url_for(path)?;
        debug!(%url, "GET");
        self.send(self.request(Method::GET, url.clone()), &url, &[])
            .await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// `PUT` with an optional mtime hint in whole seconds
    pub async fn put(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        modified: Option<DateTime<Utc>>,
    ) -> Result<(), WebDavError> {
        let url = self.url_for(path)?;
        debug!(%url, size = data.len(), "PUT");

        let mut request = self.request(Method::PUT, url.clone()).body(data);
        if let Some(modified) = modified {
            request = request.header(MTIME_HEADER, modified.timestamp().to_string());
        }
        self.send(request, &url, &[]).await?;
        Ok(())
    }

    /// `MKCOL`; 405 (already exists) counts as success
    pub async fn mkcol(&self, path: &RemotePath) -> Result<(), WebDavError> {
        let url = self.url_for(path)?;
        debug!(%url, "MKCOL");
        self.send(
            self.request(dav_method(b"MKCOL"), url.clone()),
            &url,
            &[StatusCode::CREATED, StatusCode::METHOD_NOT_ALLOWED],
        )
        .await?;
        Ok(())
    }

    pub async fn delete(&self, path: &RemotePath) -> Result<(), WebDavError> {
        let url = self.url_for(path)?;
        debug!(%url, "DELETE");
        self.send(self.request(Method::DELETE, url.clone()), &url, &[])
            .await?;
        Ok(())
    }

    /// `MOVE` with `Overwrite: T`
    pub async fn move_to(&self, from: &RemotePath, to: &RemotePath) -> Result<(), WebDavError> {
        self.relocate(b"MOVE", from, to).await
    }

    /// `COPY` with `Overwrite: T`
    pub async fn copy_to(&self, from: &RemotePath, to: &RemotePath) -> Result<(), WebDavError> {
        self.relocate(b"COPY", from, to).await
    }

    async fn relocate(
        &self,
        method: &'static [u8],
        from: &RemotePath,
        to: &RemotePath,
    ) -> Result<(), WebDavError> {
        let url = self.url_for(from)?;
        let destination = self.url_for(to)?;
        debug!(%url, %destination, method = %String::from_utf8_lossy(method), "Relocate");

        let request = self
            .request(dav_method(method), url.clone())
            .header("Destination", destination.as_str())
            .header("Overwrite", "T");
        self.send(request, &url, &[]).await?;
        Ok(())
    }
}
