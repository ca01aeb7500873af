//! swcache server entry point.
//!
//! Boots the interception engine behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{EngineConfig, FetchClient, FetchConfig, InterceptionEngine};
use swcache_core::{AppConfig, CacheDb, Store};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.generation_name(),
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting swcache server on stdio transport"
    );

    let cache = Arc::new(CacheDb::open(&config.db_path).await?);
    let store: Arc<dyn Store> = cache.clone();
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);
    let engine = Arc::new(InterceptionEngine::new(EngineConfig::from_app_config(&config)?, store, fetcher)?);

    let handler = handler::SwCacheServer::new(Arc::clone(&engine), cache);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    engine.flush().await;
    tracing::info!("pending writes flushed, shutting down");

    Ok(())
}
