//! cache_get tool implementation.
//!
//! Lists the stored snapshots of one request across all generations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, EntryMeta, RequestDescriptor};

use crate::error::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL of the stored request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Canonical request key, e.g. `GET https://example.com/app.css`.
    pub key: String,
    pub found: bool,
    /// One entry per generation holding a snapshot, newest generation first.
    pub entries: Vec<EntryMeta>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let key = RequestDescriptor::parse(&params.method, &params.url)?.key();
    let entries = cache.entry_meta(&key).await?;

    json_result(&CacheGetOutput { key: key.to_string(), found: !entries.is_empty(), entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output;
    use swcache_core::Response;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { url: "https://example.com/app.css".into(), method: default_method() };

        let out = output(&get_impl(&cache, params).await.unwrap());
        assert_eq!(out["found"], false);
        assert_eq!(out["key"], "GET https://example.com/app.css");
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let key = RequestDescriptor::parse("GET", "https://example.com/app.css").unwrap().key();
        cache.create_generation("site-v5").await.unwrap();
        cache
            .put_entry("site-v5", &key, Response::new(200, "body{}").with_header("Content-Type", "text/css"))
            .await
            .unwrap();

        let params = CacheGetParams { url: "https://example.com/app.css#top".into(), method: "get".into() };
        let out = output(&get_impl(&cache, params).await.unwrap());
        assert_eq!(out["found"], true);
        assert_eq!(out["entries"][0]["generation"], "site-v5");
        assert_eq!(out["entries"][0]["content_type"], "text/css");
    }

    #[tokio::test]
    async fn test_get_impl_invalid_url() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { url: "not a url".into(), method: default_method() };
        let err = get_impl(&cache, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
