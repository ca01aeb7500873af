//! Interception engine for swcache.
//!
//! This crate classifies intercepted requests, runs the matching fetch
//! strategy against the generation store and the network, and drives the
//! install/activate lifecycle. The server crate dispatches host events to it.

pub mod classify;
pub mod engine;
pub mod fetch;
pub mod lifecycle;
pub mod maintainer;
pub mod notify;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use classify::{BypassReason, Classifier, ClassifierConfig, PolicyTag};
pub use engine::{EngineConfig, Interception, InterceptionEngine};
pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use lifecycle::{ActivateReport, InstallReport, WorkerState};
pub use maintainer::StoreMaintainer;
pub use notify::{ClientAction, Notification, NotificationAction, PushPayload};
pub use strategy::{ResponseSource, Served, Strategy};
