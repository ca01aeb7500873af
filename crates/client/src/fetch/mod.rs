//! Network fetch primitive.
//!
//! ### Fetcher seam
//! - The engine only sees the [`Fetcher`] trait, so tests can script the network.
//!
//! ### Response typing
//! - Same-origin final URL: `basic`
//! - Cross-origin final URL: `cors`, or `opaque` for `no-cors` requests
//! - `redirected` is set when the final URL differs from the requested one
//!
//! ### Limits
//! - Request timeout: 20s (configurable)
//! - Max redirects: 5 (configurable)
//! - Max body size: 25MB (configurable), checked against `Content-Length`
//!   before reading and against the bytes read so far while reading

pub mod url;

use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, host_matches, resolve, same_origin};

use ::url::Url;
use swcache_core::http::Headers;
use swcache_core::{AppConfig, Error, RequestDescriptor, RequestMode, Response, ResponseKind};

/// Network capability used by the interception engine.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue the request. Any rejection (offline, DNS, timeout) is an `Err`;
    /// HTTP error statuses are successful fetches.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Serving origin used to type responses.
    pub origin: Url,

    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Maximum response body size in bytes (default: 25MB)
    pub max_bytes: usize,
}

impl FetchConfig {
    /// Derive fetch settings from the application config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            max_bytes: config.max_fetch_bytes,
        })
    }
}

/// Classify a fetched response the way a browser types it.
pub fn response_kind(origin: &Url, final_url: &Url, mode: RequestMode) -> ResponseKind {
    if same_origin(origin, final_url) {
        ResponseKind::Basic
    } else if mode == RequestMode::NoCors {
        ResponseKind::Opaque
    } else {
        ResponseKind::Cors
    }
}

fn network_error(url: &Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::NetworkFailure(format!("{url}: {err}"))
    }
}

fn too_large(url: &Url, len: u64, max: usize) -> Error {
    Error::FetchTooLarge(format!("{url}: {len} bytes exceeds {max}"))
}

fn collect_headers(map: &header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else { continue };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

/// reqwest-backed [`Fetcher`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        let start = Instant::now();
        let url = request.url();

        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method(), e)))?;

        let mut builder = self.http.request(method, url.clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder.send().await.map_err(|e| network_error(url, &e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = collect_headers(response.headers());

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(too_large(url, len, self.config.max_bytes));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| network_error(url, &e))? {
            if bytes.len() + chunk.len() > self.config.max_bytes {
                return Err(too_large(url, (bytes.len() + chunk.len()) as u64, self.config.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        let mut requested = url.clone();
        requested.set_fragment(None);
        let redirected = final_url != requested;
        let kind = response_kind(&self.config.origin, &final_url, request.mode());

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes, {})",
            request.method(),
            url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len(),
            kind.as_str()
        );

        Ok(Response::new(status.as_u16(), bytes)
            .with_status_text(status.canonical_reason().unwrap_or_default())
            .with_headers(headers)
            .with_kind(kind)
            .with_redirected(redirected))
    }
}
