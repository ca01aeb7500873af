//! cache_purge tool implementation.
//!
//! Deletes one named generation, or every stale generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::CacheDb;

use crate::error::{ToolError, json_result};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete this generation. The current generation cannot be named.
    #[serde(default)]
    pub generation: Option<String>,

    /// Delete every generation other than the current one.
    #[serde(default)]
    pub stale: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Names of the generations that were deleted.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, current: &str, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.generation.is_none() && !params.stale {
        return Err(ToolError::InvalidInput("one of generation or stale must be specified".to_string()).into());
    }

    let mut deleted = Vec::new();

    if let Some(name) = params.generation {
        if name == current {
            return Err(ToolError::InvalidInput(format!("refusing to delete the current generation {name}")).into());
        }
        if cache.drop_generation(&name).await? {
            deleted.push(name);
        }
    }

    if params.stale {
        for name in cache.list_generations().await? {
            if name != current && cache.drop_generation(&name).await? {
                deleted.push(name);
            }
        }
    }

    tracing::info!(count = deleted.len(), "purged generations");
    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output;

    async fn seeded() -> CacheDb {
        let cache = CacheDb::open_in_memory().await.unwrap();
        for name in ["site-v3", "site-v4", "site-v5"] {
            cache.create_generation(name).await.unwrap();
        }
        cache
    }

    #[tokio::test]
    async fn test_purge_named() {
        let cache = seeded().await;
        let params = CachePurgeParams { generation: Some("site-v3".into()), stale: false };

        let out = output(&purge_impl(&cache, "site-v5", params).await.unwrap());
        assert_eq!(out["deleted"], serde_json::json!(["site-v3"]));
        assert_eq!(cache.list_generations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_purge_stale() {
        let cache = seeded().await;
        let params = CachePurgeParams { generation: None, stale: true };

        let out = output(&purge_impl(&cache, "site-v5", params).await.unwrap());
        assert_eq!(out["deleted"].as_array().unwrap().len(), 2);
        assert_eq!(cache.list_generations().await.unwrap(), vec!["site-v5".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_refuses_current() {
        let cache = seeded().await;
        let params = CachePurgeParams { generation: Some("site-v5".into()), stale: false };
        assert!(purge_impl(&cache, "site-v5", params).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let cache = seeded().await;
        let params = CachePurgeParams { generation: None, stale: false };
        assert!(purge_impl(&cache, "site-v5", params).await.is_err());
    }
}
