//! davmirror Core - Domain types, ports and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RemotePath`, `ContentHash`, `IgnoreSet`, `SyncMapping`
//! - **Port definitions** - Traits for adapters: `ITransport`, `ILocalFileSystem`
//! - **Configuration** - server credentials, logging, and mapping files
//!
//! # Architecture
//!
//! The domain module is pure and has no I/O. Ports define trait interfaces
//! that adapter crates implement; the sync engine drives them.

pub mod config;
pub mod domain;
pub mod ports;
