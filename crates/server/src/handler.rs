//! MCP server handler implementation.
//!
//! The tool router is the host's dispatch table: every lifecycle, request,
//! push and sync event is one tool call routed to the interception engine.
use std::sync::Arc;

use crate::tools::{
    ClickParams, PushParams, SwFetchParams, SyncParams,
    cache::{CacheGetParams, CachePurgeParams, generations_impl, get_impl, purge_impl},
    events::{click_impl, push_impl, sync_impl},
    fetch::fetch_impl,
    lifecycle::{activate_impl, install_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::InterceptionEngine;
use swcache_core::CacheDb;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    engine: Arc<InterceptionEngine>,
    cache: Arc<CacheDb>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around an engine and the store it writes to.
    pub fn new(engine: Arc<InterceptionEngine>, cache: Arc<CacheDb>) -> Self {
        Self { engine, cache, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: open the current generation and pre-cache the app shell. \
                          Fails without side effects if any shell resource cannot be fetched.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.engine).await
    }

    #[tool(description = "Activate the installed worker: delete every stale generation and claim open pages.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.engine).await
    }

    /// Handle one intercepted request.
    ///
    /// The request is classified (bypass, navigation, static, api) and served
    /// network-only, network-first with shell fallback, cache-first or
    /// network-first accordingly.
    #[tool(description = "Intercept a request. Returns the served response with its policy and source, \
                          or declined=true before activation.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Deliver push data. Returns the notification to show, or null for a malformed payload.")]
    async fn sw_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.engine, params.0)
    }

    #[tool(description = "Forward a notification click (action open, close or empty) and get the client action.")]
    async fn sw_notification_click(&self, params: Parameters<ClickParams>) -> Result<CallToolResult, McpError> {
        click_impl(&self.engine, params.0)
    }

    #[tool(description = "Deliver a background sync event.")]
    async fn sw_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.engine, params.0)
    }

    #[tool(description = "Show stored snapshots of a request (by URL and method) across generations.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.cache, params.0).await
    }

    #[tool(description = "List generations in the store with their entry counts.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.cache, self.engine.generation()).await
    }

    #[tool(description = "Delete a named generation, or every stale generation with stale=true.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.cache, self.engine.generation(), params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
