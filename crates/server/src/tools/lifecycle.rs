//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::InterceptionEngine;

use crate::error::json_result;

/// Implementation of the sw_install tool.
pub async fn install_impl(engine: &InterceptionEngine) -> Result<CallToolResult, McpError> {
    let report = engine.install().await?;
    json_result(&report)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(engine: &InterceptionEngine) -> Result<CallToolResult, McpError> {
    let report = engine.activate().await?;
    json_result(&report)
}
