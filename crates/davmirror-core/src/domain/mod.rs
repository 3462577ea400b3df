//! Domain types and business rules
//!
//! This module contains the core domain types for davmirror:
//! - Newtypes for validated remote paths and content digests
//! - Ignore pattern sets
//! - Sync mappings and directions
//! - Domain-specific error types

pub mod errors;
pub mod ignore;
pub mod mapping;
pub mod newtypes;

// Re-export commonly used types
pub use errors::DomainError;
pub use ignore::IgnoreSet;
pub use mapping::{Direction, SyncMapping};
pub use newtypes::*;
