//! Request classification.
//!
//! Maps a [`RequestDescriptor`] to a [`PolicyTag`]. The mapping is pure and
//! recomputed for every request:
//!
//! 1. `bypass`: non-GET, non-http(s), excluded media extension or domain,
//!    or cross-origin when that bypass is enabled
//! 2. `navigation`: navigate mode or document destination
//! 3. `api`: path under a configured API prefix
//! 4. `static`: everything else

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, Destination, Error, RequestDescriptor};
use url::Url;

use crate::fetch::{host_matches, same_origin};

/// Classification outcome that selects a fetch strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyTag {
    Bypass,
    Navigation,
    Static,
    Api,
}

impl PolicyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyTag::Bypass => "bypass",
            PolicyTag::Navigation => "navigation",
            PolicyTag::Static => "static",
            PolicyTag::Api => "api",
        }
    }
}

impl fmt::Display for PolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request bypasses the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    UnsafeMethod,
    UnsupportedScheme,
    ExcludedExtension,
    ExcludedDomain,
    CrossOrigin,
}

/// Tunable classifier inputs.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub origin: Url,
    pub excluded_extensions: Vec<String>,
    pub excluded_domains: Vec<String>,
    pub api_prefixes: Vec<String>,
    pub bypass_cross_origin: bool,
    pub navigation_by_accept: bool,
}

impl ClassifierConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            excluded_extensions: config.excluded_extensions.clone(),
            excluded_domains: config.excluded_domains.clone(),
            api_prefixes: config.api_prefixes.clone(),
            bypass_cross_origin: config.bypass_cross_origin,
            navigation_by_accept: config.navigation_by_accept,
        })
    }
}

/// Compiled classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
    extension_pattern: Option<Regex>,
}

impl Classifier {
    /// Compile the extension matcher.
    pub fn new(config: ClassifierConfig) -> Result<Self, Error> {
        let extension_pattern = if config.excluded_extensions.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = config
                .excluded_extensions
                .iter()
                .map(|ext| regex::escape(ext.trim_start_matches('.')))
                .collect();
            let pattern = format!(r"(?i)\.(?:{})$", alternatives.join("|"));
            Some(Regex::new(&pattern).map_err(|e| Error::InvalidInput(format!("excluded_extensions: {e}")))?)
        };

        Ok(Self { config, extension_pattern })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// First bypass rule the request trips, if any.
    pub fn bypass_reason(&self, request: &RequestDescriptor) -> Option<BypassReason> {
        let url = request.url();

        if request.method() != "GET" {
            return Some(BypassReason::UnsafeMethod);
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Some(BypassReason::UnsupportedScheme);
        }
        if let Some(pattern) = &self.extension_pattern
            && pattern.is_match(url.path())
        {
            return Some(BypassReason::ExcludedExtension);
        }
        if let Some(host) = url.host_str()
            && self.config.excluded_domains.iter().any(|d| host_matches(host, d))
        {
            return Some(BypassReason::ExcludedDomain);
        }
        if self.config.bypass_cross_origin && !same_origin(url, &self.config.origin) {
            return Some(BypassReason::CrossOrigin);
        }
        None
    }

    fn is_navigation(&self, request: &RequestDescriptor) -> bool {
        request.is_navigation()
            || request.destination() == Destination::Document
            || (self.config.navigation_by_accept
                && request.header("accept").is_some_and(|accept| accept.contains("text/html")))
    }

    fn is_api(&self, request: &RequestDescriptor) -> bool {
        let path = request.url().path();
        self.config.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Classify a request.
    pub fn classify(&self, request: &RequestDescriptor) -> PolicyTag {
        if let Some(reason) = self.bypass_reason(request) {
            tracing::debug!(url = %request.url(), ?reason, "bypass");
            return PolicyTag::Bypass;
        }
        if self.is_navigation(request) {
            PolicyTag::Navigation
        } else if self.is_api(request) {
            PolicyTag::Api
        } else {
            PolicyTag::Static
        }
    }
}
