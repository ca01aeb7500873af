//! Push and notification-click contracts.
//!
//! The notification UI is an external collaborator: this module only shapes
//! what it is handed and interprets the click events it forwards back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swcache_core::Error;
use url::Url;

use crate::fetch::resolve;

/// Decoded push payload. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parse raw push data.
///
/// # Errors
///
/// Returns `Error::MalformedPushPayload` when the payload is absent, not
/// JSON, or not a JSON object.
pub fn parse_push_payload(data: Option<&[u8]>) -> Result<PushPayload, Error> {
    let data = data.ok_or_else(|| Error::MalformedPushPayload("push event carried no data".into()))?;

    let value: serde_json::Value =
        serde_json::from_slice(data).map_err(|e| Error::MalformedPushPayload(format!("invalid JSON: {e}")))?;

    if !value.is_object() {
        return Err(Error::MalformedPushPayload("payload is not a JSON object".into()));
    }

    serde_json::from_value(value).map_err(|e| Error::MalformedPushPayload(e.to_string()))
}

/// Click actions offered on every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Open,
    Close,
}

impl NotificationAction {
    /// Interpret a forwarded action identifier. A click on the notification
    /// body arrives with an empty action and counts as `open`.
    pub fn from_action(action: &str) -> Option<Self> {
        match action.trim() {
            "" | "open" => Some(NotificationAction::Open),
            "close" => Some(NotificationAction::Close),
            _ => None,
        }
    }
}

/// Notification handed to the display subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: Option<String>,
    pub icon: Option<String>,
    /// Absolute URL opened on click.
    pub url: String,
    pub actions: Vec<NotificationAction>,
    pub timestamp: DateTime<Utc>,
}

/// Defaults applied when a payload leaves fields out.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub icon: Option<String>,
    pub origin: Url,
}

impl Notification {
    /// Shape a notification from a payload. A `url` that does not resolve
    /// against the origin falls back to the origin root.
    pub fn from_payload(payload: PushPayload, defaults: &NotificationDefaults) -> Self {
        let url = match payload.url.as_deref() {
            Some(raw) => resolve(&defaults.origin, raw).unwrap_or_else(|e| {
                tracing::warn!(url = raw, error = %e, "push url rejected, using origin");
                defaults.origin.clone()
            }),
            None => defaults.origin.clone(),
        };

        Self {
            title: payload.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| defaults.title.clone()),
            body: payload.body,
            icon: defaults.icon.clone(),
            url: url.to_string(),
            actions: vec![NotificationAction::Open, NotificationAction::Close],
            timestamp: Utc::now(),
        }
    }
}

/// What the host should do with its page contexts after a click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    /// Focus or open a window at `url`.
    OpenWindow { url: String },
    None,
}
