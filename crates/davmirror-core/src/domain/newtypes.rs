//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for remote paths and
//! content digests. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Path types
// ============================================================================

/// A normalized absolute path on the remote side
///
/// RemotePath is always:
/// - Absolute (a leading `/` is added when missing)
/// - Free of trailing slashes, except for the root itself
/// - Free of empty, `.` and `..` components
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Create a new RemotePath, normalizing leading and trailing slashes
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRemotePath` for empty components
    /// (`a//b`) or dot components (`.`, `..`)
    pub fn new(path: String) -> Result<Self, DomainError> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        for component in trimmed.split('/') {
            match component {
                "" => {
                    return Err(DomainError::InvalidRemotePath(format!(
                        "Remote path contains invalid double slashes: {path}"
                    )))
                }
                "." | ".." => {
                    return Err(DomainError::InvalidRemotePath(format!(
                        "Remote path contains invalid traversal: {path}"
                    )))
                }
                _ => {}
            }
        }

        Ok(Self(format!("/{trimmed}")))
    }

    /// Create the root path "/"
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for "/"
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Iterate over the path components, root yields nothing
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Join a single entry name
    ///
    /// # Errors
    /// Returns error if the name is empty, contains `/`, or is a dot component
    pub fn join(&self, name: &str) -> Result<Self, DomainError> {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(DomainError::InvalidRemotePath(format!(
                "Invalid path component: {name}"
            )));
        }

        if self.is_root() {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }

    /// Get the parent path
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Get the last component
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }

        self.0.rsplit('/').next()
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// Content digests
// ============================================================================

/// MD5 content digest as 32 lowercase hex characters
///
/// Remote servers spell digests in either case; construction lowercases
/// so two `ContentHash` values compare equal regardless of origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Number of hex characters in an MD5 digest
    pub const HEX_LEN: usize = 32;

    /// Create a new ContentHash
    ///
    /// # Errors
    /// Returns error if the value is not exactly 32 hex characters
    pub fn new(hash: String) -> Result<Self, DomainError> {
        if hash.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidHash(format!(
                "Hash has wrong length: expected {} characters, got {}",
                Self::HEX_LEN,
                hash.len()
            )));
        }

        if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidHash(format!(
                "Hash is not hexadecimal: {hash}"
            )));
        }

        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Wrap a raw 16-byte MD5 digest
    #[must_use]
    pub fn from_digest(digest: [u8; 16]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}
