//! Fetch strategies.
//!
//! | Policy     | Strategy                  | On network failure                        |
//! |------------|---------------------------|-------------------------------------------|
//! | bypass     | network-only              | error propagates                          |
//! | navigation | network-first             | stored page, then shell, then offline 503 |
//! | api        | network-first             | stored snapshot, else error propagates    |
//! | static     | cache-first, then network | placeholder image or offline 503          |
//!
//! Store writes are handed to the [`StoreMaintainer`] and never delay the
//! response.

mod offline;

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{Destination, Error, RequestDescriptor, RequestKey, Response};

use crate::classify::PolicyTag;
use crate::fetch::Fetcher;
use crate::maintainer::StoreMaintainer;

pub use offline::offline_response;

/// Strategy selected for a policy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkOnly,
    NetworkFirstWithShell,
    NetworkFirst,
    CacheFirst,
}

impl From<PolicyTag> for Strategy {
    fn from(tag: PolicyTag) -> Self {
        match tag {
            PolicyTag::Bypass => Strategy::NetworkOnly,
            PolicyTag::Navigation => Strategy::NetworkFirstWithShell,
            PolicyTag::Api => Strategy::NetworkFirst,
            PolicyTag::Static => Strategy::CacheFirst,
        }
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Shell,
    Placeholder,
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Shell => "shell",
            ResponseSource::Placeholder => "placeholder",
            ResponseSource::Offline => "offline",
        }
    }
}

/// A response produced by a strategy.
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    pub policy: PolicyTag,
}

/// Runs the strategy for a classified request.
pub struct StrategySelector {
    fetcher: Arc<dyn Fetcher>,
    maintainer: Arc<StoreMaintainer>,
    shell_key: RequestKey,
    placeholder_key: Option<RequestKey>,
    refresh_on_navigation: bool,
}

impl StrategySelector {
    pub fn new(
        fetcher: Arc<dyn Fetcher>, maintainer: Arc<StoreMaintainer>, shell_key: RequestKey,
        placeholder_key: Option<RequestKey>, refresh_on_navigation: bool,
    ) -> Self {
        Self { fetcher, maintainer, shell_key, placeholder_key, refresh_on_navigation }
    }

    /// Produce a response for `request` under policy `tag`.
    ///
    /// # Errors
    ///
    /// Network errors propagate for `bypass`, and for `api` when no snapshot
    /// is stored. `navigation` and `static` always resolve to a response.
    pub async fn execute(&self, tag: PolicyTag, request: &RequestDescriptor) -> Result<Served, Error> {
        let served = |response, source| Served { response, source, policy: tag };

        match Strategy::from(tag) {
            Strategy::NetworkOnly => {
                let response = self.fetcher.fetch(request).await?;
                Ok(served(response, ResponseSource::Network))
            }
            Strategy::NetworkFirstWithShell => {
                let (response, source) = self.navigation(request).await;
                Ok(served(response, source))
            }
            Strategy::NetworkFirst => {
                let (response, source) = self.network_first(request).await?;
                Ok(served(response, source))
            }
            Strategy::CacheFirst => {
                let (response, source) = self.cache_first(request).await;
                Ok(served(response, source))
            }
        }
    }

    async fn navigation(&self, request: &RequestDescriptor) -> (Response, ResponseSource) {
        let key = request.key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if self.refresh_on_navigation {
                    self.maintainer.write_back(key, response.duplicate());
                }
                (response, ResponseSource::Network)
            }
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "navigation offline, falling back");
                if let Some(stored) = self.maintainer.lookup_any(&key).await {
                    return (stored, ResponseSource::Cache);
                }
                if let Some(shell) = self.maintainer.lookup_any(&self.shell_key).await {
                    return (shell, ResponseSource::Shell);
                }
                tracing::warn!(url = %request.url(), "no shell document stored, serving offline response");
                (offline_response(Destination::Document), ResponseSource::Offline)
            }
        }
    }

    async fn network_first(&self, request: &RequestDescriptor) -> Result<(Response, ResponseSource), Error> {
        let key = request.key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.maintainer.write_back(key, response.duplicate());
                Ok((response, ResponseSource::Network))
            }
            Err(e) => match self.maintainer.lookup_any(&key).await {
                Some(stored) => {
                    tracing::debug!(url = %request.url(), error = %e, "network failed, serving stored snapshot");
                    Ok((stored, ResponseSource::Cache))
                }
                None => Err(e),
            },
        }
    }

    async fn cache_first(&self, request: &RequestDescriptor) -> (Response, ResponseSource) {
        let key = request.key();

        if let Some(stored) = self.maintainer.lookup_any(&key).await {
            return (stored, ResponseSource::Cache);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.maintainer.write_back(key, response.duplicate());
                (response, ResponseSource::Network)
            }
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "static fetch failed");
                if request.destination() == Destination::Image
                    && let Some(placeholder_key) = &self.placeholder_key
                    && let Some(placeholder) = self.maintainer.lookup_any(placeholder_key).await
                {
                    return (placeholder, ResponseSource::Placeholder);
                }
                (offline_response(request.destination()), ResponseSource::Offline)
            }
        }
    }
}
