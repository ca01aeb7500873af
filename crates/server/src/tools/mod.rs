//! MCP tool implementations.
//!
//! One tool per host event (`sw_*`) plus store inspection tools (`cache_*`).

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod test_support;

pub use events::{ClickParams, PushParams, SyncParams};
pub use fetch::SwFetchParams;
