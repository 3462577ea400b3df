//! davmirror WebDAV - remote tree access over WebDAV
//!
//! Provides an async client for ownCloud/Nextcloud-style WebDAV servers:
//! - `PROPFIND` listings with size, mtime and `oc:checksums`
//! - Streaming downloads and whole-body uploads with an mtime hint
//! - Collection management (`MKCOL`, `DELETE`, `MOVE`, `COPY`)
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with Basic auth and URL construction
//! - [`multistatus`] - `207 Multi-Status` response parser
//! - [`provider`] - [`ITransport`](davmirror_core::ports::ITransport) adapter

pub mod client;
pub mod multistatus;
pub mod provider;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

pub use client::WebDavClient;
pub use provider::WebDavTransport;

/// Errors that can occur when talking to a WebDAV server
#[derive(Debug, Error)]
pub enum WebDavError {
    /// The configured base URL or a derived URL is unusable
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No password in the configuration or environment
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Credentials rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parent collection missing or resource state conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 5xx from the server
    #[error("Server error {status}: {url}")]
    ServerError { status: u16, url: String },

    /// Any other status the operation does not accept
    #[error("Unexpected status {status}: {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl WebDavError {
    /// Classifies a status the caller did not accept
    pub fn from_status(status: StatusCode, url: &Url) -> Self {
        let url = url.to_string();
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(url),
            StatusCode::FORBIDDEN => Self::Forbidden(url),
            StatusCode::NOT_FOUND => Self::NotFound(url),
            StatusCode::CONFLICT => Self::Conflict(url),
            s if s.is_server_error() => Self::ServerError {
                status: s.as_u16(),
                url,
            },
            s => Self::UnexpectedStatus {
                status: s.as_u16(),
                url,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
