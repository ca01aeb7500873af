//! sw_fetch tool implementation.
//!
//! Dispatches one intercepted request to the engine and reports how it was
//! served.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Interception, InterceptionEngine, fetch::resolve};
use swcache_core::{Destination, RequestDescriptor, RequestMode, Response};

use crate::error::{ToolError, json_result};

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL of any scheme, or a path relative to the serving origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Fetch mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// Request destination: "document", "image", "script", "style", "font" or other.
    #[serde(default)]
    pub destination: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    /// True when the engine left the request to default network handling.
    pub declined: bool,
    pub policy: Option<String>,
    pub source: Option<String>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body as text, or base64 for binary content (see `body_encoding`).
    pub body: Option<String>,
    /// "utf-8" or "base64".
    pub body_encoding: Option<&'static str>,
    pub body_len: usize,
}

fn is_textual(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || matches!(
            essence.as_str(),
            "application/json" | "application/javascript" | "application/xml" | "application/manifest+json"
        )
}

/// Encode a body for the tool result without corrupting binary content.
///
/// Untyped bodies are returned as text only when they are valid UTF-8.
fn encode_body(response: &Response) -> (String, &'static str) {
    let body = response.body();
    let text = match response.content_type() {
        Some(content_type) if is_textual(content_type) => std::str::from_utf8(body).ok(),
        Some(_) => None,
        None => std::str::from_utf8(body).ok(),
    };
    match text {
        Some(text) => (text.to_string(), "utf-8"),
        None => (STANDARD.encode(body), "base64"),
    }
}

fn descriptor(engine: &InterceptionEngine, params: &SwFetchParams) -> Result<RequestDescriptor, ToolError> {
    let input = params.url.trim();
    let request = match RequestDescriptor::parse(&params.method, input) {
        Ok(request) => request,
        Err(_) => {
            let url = resolve(&engine.config().origin, input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
            RequestDescriptor::new(&params.method, url)
        }
    };

    let mode: RequestMode = match params.mode.as_deref() {
        Some(mode) => mode.parse::<RequestMode>().map_err(|e| ToolError::InvalidInput(e.to_string()))?,
        None => RequestMode::default(),
    };
    let destination: Destination = match params.destination.as_deref() {
        Some(destination) => destination.parse::<Destination>().map_err(|e| ToolError::InvalidInput(e.to_string()))?,
        None => Destination::default(),
    };

    let mut request = request.with_mode(mode).with_destination(destination);
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(engine: &InterceptionEngine, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let request = descriptor(engine, &params)?;
    let url = request.url().to_string();

    let output = match engine.fetch(&request).await? {
        Interception::Declined => SwFetchOutput {
            url,
            declined: true,
            policy: None,
            source: None,
            status: None,
            status_text: None,
            headers: BTreeMap::new(),
            body: None,
            body_encoding: None,
            body_len: 0,
        },
        Interception::Respond(served) => {
            let response = served.response;
            let (body, encoding) = encode_body(&response);
            SwFetchOutput {
                url,
                declined: false,
                policy: Some(served.policy.to_string()),
                source: Some(served.source.as_str().to_string()),
                status: Some(response.status()),
                status_text: Some(response.status_text().to_string()),
                headers: response.headers().clone(),
                body: Some(body),
                body_encoding: Some(encoding),
                body_len: response.body().len(),
            }
        }
    };

    json_result(&output)
}
