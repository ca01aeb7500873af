//! URL resolution against the serving origin.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a root-relative path or absolute URL against `base`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative input onto `base`
/// 3. Require an http(s) scheme
/// 4. Lowercase the host
pub fn resolve(base: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Whether `host` is `domain` or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://portfolio.example").unwrap()
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve(&origin(), "/assets/icon-192x192.png").unwrap();
        assert_eq!(url.as_str(), "https://portfolio.example/assets/icon-192x192.png");
    }

    #[test]
    fn test_resolve_absolute_keeps_host() {
        let url = resolve(&origin(), "https://CDN.example/app.js").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example"));
    }

    #[test]
    fn test_resolve_preserves_query() {
        let url = resolve(&origin(), "/api/items?page=2").unwrap();
        assert_eq!(url.query(), Some("page=2"));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve(&origin(), "  /index.html  ").unwrap();
        assert_eq!(url.path(), "/index.html");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve(&origin(), "data:text/plain,hello");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin() {
        let a = Url::parse("https://portfolio.example/a").unwrap();
        let b = Url::parse("https://portfolio.example/b?x=1").unwrap();
        let other_port = Url::parse("https://portfolio.example:8443/a").unwrap();
        let other_scheme = Url::parse("http://portfolio.example/a").unwrap();
        assert!(same_origin(&a, &b));
        assert!(!same_origin(&a, &other_port));
        assert!(!same_origin(&a, &other_scheme));
    }

    #[test]
    fn test_host_matches() {
        assert!(host_matches("dropboxusercontent.com", "dropboxusercontent.com"));
        assert!(host_matches("dl.dropboxusercontent.com", "dropboxusercontent.com"));
        assert!(host_matches("FONTS.googleapis.com", "googleapis.com"));
        assert!(!host_matches("notgoogleapis.com", "googleapis.com"));
        assert!(!host_matches("googleapis.com.evil.example", "googleapis.com"));
    }
}
