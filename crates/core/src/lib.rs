//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response value types shared by the engine and the store
//! - Generation store implementation with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod store;

pub use cache::{CacheDb, EntryMeta};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, RequestDescriptor, RequestKey, RequestMode, Response, ResponseKind};
pub use store::{LookupScope, Store};
