//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! List-valued fields take TOML array syntax in environment variables,
//! e.g. `SWCACHE_API_PREFIXES='["/api/", "/data/"]'`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite generation store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Fixed part of every generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token embedded in the current generation name.
    ///
    /// Bumping it on deployment invalidates every previously stored entry.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Serving origin of the pages under control, e.g. `https://example.com`.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Root-relative paths pre-cached at install, in order.
    #[serde(default = "default_app_shell")]
    pub app_shell: Vec<String>,

    /// Shell document served to offline navigations.
    #[serde(default = "default_shell_document")]
    pub shell_document: String,

    /// Pre-cached image served when an image cannot be fetched.
    #[serde(default = "default_image_placeholder")]
    pub image_placeholder: Option<String>,

    /// File extensions (without dot) that are never stored.
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,

    /// Hosts (and their subdomains) whose responses are never stored.
    #[serde(default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,

    /// Path prefixes served network-first.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Pass cross-origin requests straight to the network.
    #[serde(default = "default_true")]
    pub bypass_cross_origin: bool,

    /// Treat requests accepting `text/html` as navigations.
    #[serde(default)]
    pub navigation_by_accept: bool,

    /// Refresh the stored copy of a page after a successful navigation.
    #[serde(default = "default_true")]
    pub refresh_on_navigation: bool,

    /// Largest body that will be written to the store.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,

    /// Largest response body read from the network; larger bodies fail the fetch.
    #[serde(default = "default_max_fetch_bytes")]
    pub max_fetch_bytes: usize,

    /// User-Agent string for network fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network fetch timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum redirects followed per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Title used when a push payload has none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Icon shown with notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_cache_prefix() -> String {
    "site".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_app_shell() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/assets/icon-192x192.png",
        "/assets/icon-512x512.png",
        "/assets/preview-1200x630.jpg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_shell_document() -> String {
    "/index.html".into()
}

fn default_image_placeholder() -> Option<String> {
    Some("/assets/icon-192x192.png".into())
}

fn default_excluded_extensions() -> Vec<String> {
    ["mp4", "webm", "avi", "mov", "mpeg"].into_iter().map(String::from).collect()
}

fn default_excluded_domains() -> Vec<String> {
    ["dropboxusercontent.com", "fonts.bunny.net", "googleapis.com", "youtube.com", "vimeo.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_max_entry_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_fetch_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_notification_title() -> String {
    "New update".into()
}

fn default_notification_icon() -> Option<String> {
    Some("/assets/icon-192x192.png".into())
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            app_shell: default_app_shell(),
            shell_document: default_shell_document(),
            image_placeholder: default_image_placeholder(),
            excluded_extensions: default_excluded_extensions(),
            excluded_domains: default_excluded_domains(),
            api_prefixes: default_api_prefixes(),
            bypass_cross_origin: true,
            navigation_by_accept: false,
            refresh_on_navigation: true,
            max_entry_bytes: default_max_entry_bytes(),
            max_fetch_bytes: default_max_fetch_bytes(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            notification_title: default_notification_title(),
            notification_icon: default_notification_icon(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current generation, e.g. `site-v5`.
    pub fn generation_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Serving origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` does not parse.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
