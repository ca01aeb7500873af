//! sw_push, sw_notification_click and sw_sync tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ClientAction, InterceptionEngine, Notification};

use crate::error::json_result;

/// Input parameters for sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push data, expected to be a JSON object with optional title, body and url.
    #[serde(default)]
    pub data: Option<String>,
}

/// Output structure for sw_push tool.
#[derive(Debug, Clone, Serialize)]
pub struct PushOutput {
    /// Notification to display, absent when the payload was rejected.
    pub notification: Option<Notification>,
}

/// Input parameters for sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClickParams {
    /// Action identifier: "open", "close", or empty for a click on the body.
    #[serde(default)]
    pub action: String,

    /// Target URL stored with the notification.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output structure for sw_notification_click tool.
#[derive(Debug, Clone, Serialize)]
pub struct ClickOutput {
    pub client_action: ClientAction,
}

/// Input parameters for sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    pub tag: String,
    pub handled: bool,
}

/// Implementation of the sw_push tool.
pub fn push_impl(engine: &InterceptionEngine, params: PushParams) -> Result<CallToolResult, McpError> {
    let notification = engine.push(params.data.as_deref().map(str::as_bytes));
    json_result(&PushOutput { notification })
}

/// Implementation of the sw_notification_click tool.
pub fn click_impl(engine: &InterceptionEngine, params: ClickParams) -> Result<CallToolResult, McpError> {
    let client_action = engine.notification_click(&params.action, params.url.as_deref());
    json_result(&ClickOutput { client_action })
}

/// Implementation of the sw_sync tool.
pub fn sync_impl(engine: &InterceptionEngine, params: SyncParams) -> Result<CallToolResult, McpError> {
    engine.sync(&params.tag);
    json_result(&SyncOutput { tag: params.tag, handled: true })
}
