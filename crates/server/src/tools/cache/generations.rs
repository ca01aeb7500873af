//! cache_generations tool implementation.
//!
//! Lists every generation in the store with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::CacheDb;

use crate::error::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub entries: u64,
    /// Whether this is the generation the running engine serves.
    pub current: bool,
}

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    /// Oldest first.
    pub generations: Vec<GenerationInfo>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(cache: &CacheDb, current: &str) -> Result<CallToolResult, McpError> {
    let mut generations = Vec::new();
    for name in cache.list_generations().await? {
        let entries = cache.count_entries(&name).await?;
        generations.push(GenerationInfo { current: name == current, name, entries });
    }

    json_result(&CacheGenerationsOutput { generations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output;
    use swcache_core::{RequestDescriptor, Response};

    #[tokio::test]
    async fn test_lists_generations_with_counts() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.create_generation("site-v4").await.unwrap();
        cache.create_generation("site-v5").await.unwrap();
        let key = RequestDescriptor::parse("GET", "https://example.com/").unwrap().key();
        cache.put_entry("site-v5", &key, Response::new(200, "root")).await.unwrap();

        let out = output(&generations_impl(&cache, "site-v5").await.unwrap());
        let generations = out["generations"].as_array().unwrap();
        assert_eq!(generations.len(), 2);

        let v5 = generations.iter().find(|g| g["name"] == "site-v5").unwrap();
        assert_eq!(v5["entries"], 1);
        assert_eq!(v5["current"], true);
        let v4 = generations.iter().find(|g| g["name"] == "site-v4").unwrap();
        assert_eq!(v4["current"], false);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let out = output(&generations_impl(&cache, "site-v5").await.unwrap());
        assert!(out["generations"].as_array().unwrap().is_empty());
    }
}
