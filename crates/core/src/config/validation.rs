//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `cache_version` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) origin
    /// - `app_shell` is empty or has a path not starting with `/`
    /// - `shell_document` is not part of `app_shell`
    /// - `max_entry_bytes` is 0 or exceeds 50MB
    /// - `max_fetch_bytes` is 0, exceeds 200MB, or is below `max_entry_bytes`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_redirects` exceeds 20
    /// - `user_agent` is empty
    /// - an excluded extension, excluded domain or API prefix is malformed
    ///
    /// Returns `ConfigError::Missing` if `app_shell` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_token(&self.cache_prefix) {
            return Err(invalid("cache_prefix", "must be non-empty without whitespace"));
        }
        if !is_token(&self.cache_version) {
            return Err(invalid("cache_version", "must be non-empty without whitespace"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.host_str().is_none() {
            return Err(invalid("origin", "must include a host"));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(invalid("origin", "must not include a path or query"));
        }

        if self.app_shell.is_empty() {
            return Err(ConfigError::Missing {
                field: "app_shell".into(),
                hint: "list at least the shell document, e.g. [\"/index.html\"]".into(),
            });
        }
        if let Some(path) = self.app_shell.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("app_shell", format!("path must be root-relative: {path}")));
        }
        if !self.app_shell.contains(&self.shell_document) {
            return Err(invalid("shell_document", "must be listed in app_shell"));
        }
        if let Some(placeholder) = &self.image_placeholder
            && !self.app_shell.contains(placeholder)
        {
            tracing::warn!(
                placeholder = %placeholder,
                "image_placeholder is not in app_shell; it is only served once cached by a later fetch"
            );
        }

        if self.max_entry_bytes == 0 {
            return Err(invalid("max_entry_bytes", "must be greater than 0"));
        }
        if self.max_entry_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_entry_bytes", "must not exceed 50MB"));
        }

        if self.max_fetch_bytes == 0 {
            return Err(invalid("max_fetch_bytes", "must be greater than 0"));
        }
        if self.max_fetch_bytes > 200 * 1024 * 1024 {
            return Err(invalid("max_fetch_bytes", "must not exceed 200MB"));
        }
        if self.max_fetch_bytes < self.max_entry_bytes {
            return Err(invalid("max_fetch_bytes", "must be at least max_entry_bytes"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_redirects > 20 {
            return Err(invalid("max_redirects", "must not exceed 20"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if let Some(ext) = self.excluded_extensions.iter().find(|e| !is_token(e) || e.contains(['.', '/'])) {
            return Err(invalid("excluded_extensions", format!("expected a bare extension like \"mp4\", got {ext:?}")));
        }
        if let Some(domain) = self.excluded_domains.iter().find(|d| !is_token(d) || d.contains('/')) {
            return Err(invalid("excluded_domains", format!("expected a host name, got {domain:?}")));
        }
        if let Some(prefix) = self.api_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("api_prefixes", format!("prefix must start with '/': {prefix}")));
        }

        Ok(())
    }
}
