//! SQLite-backed store of named response generations.
//!
//! This module provides the persistent namespace the interception engine
//! writes into, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named generations with cascading deletion of their entries
//! - Snapshots keyed by a SHA-256 of the canonical request identity
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntryMeta;
