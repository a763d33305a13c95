//! Webhook domain model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// HTTP method used when calling a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl WebhookMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookMethod::Get => "GET",
            WebhookMethod::Post => "POST",
            WebhookMethod::Put => "PUT",
            WebhookMethod::Patch => "PATCH",
            WebhookMethod::Delete => "DELETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(WebhookMethod::Get),
            "POST" => Some(WebhookMethod::Post),
            "PUT" => Some(WebhookMethod::Put),
            "PATCH" => Some(WebhookMethod::Patch),
            "DELETE" => Some(WebhookMethod::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for WebhookMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tenant's webhook subscription for one application module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Webhook {
    pub id: i64,
    pub user_id: i64,
    /// `None` subscribes every workspace of the tenant.
    pub workspace_id: Option<i64>,
    /// Application event group, e.g. "New Task".
    pub module: String,
    pub url: String,
    pub method: WebhookMethod,
}

/// Request payload for creating a webhook.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateWebhookRequest {
    #[validate(length(min = 1, max = 100, message = "Module must be 1-100 characters"))]
    pub module: String,

    #[validate(
        url(message = "Invalid URL format"),
        length(max = 2048, message = "URL must be at most 2048 characters")
    )]
    pub url: String,

    #[serde(default)]
    pub method: WebhookMethod,

    #[serde(default)]
    pub workspace_id: Option<i64>,
}

/// Values needed to insert a webhook row.
#[derive(Debug, Clone)]
pub struct NewWebhook {
    pub user_id: i64,
    pub workspace_id: Option<i64>,
    pub module: String,
    pub url: String,
    pub method: WebhookMethod,
}
