//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! path validation, content hash parsing, ignore pattern compilation
//! and mapping validation.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format or content
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid content hash (expected 32 hex characters)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// An ignore pattern failed to compile
    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending glob
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// A sync mapping is incomplete or inconsistent
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),
}
