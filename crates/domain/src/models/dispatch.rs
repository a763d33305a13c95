//! Dispatch events and per-channel outcomes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// An application event to fan out to the tenant's integrations.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DispatchEvent {
    /// Webhook module, e.g. "New Task".
    #[validate(length(min = 1, max = 100, message = "Module must be 1-100 characters"))]
    pub module: String,

    /// Notification template name used for Slack and Telegram.
    #[validate(length(min = 1, max = 191, message = "Template must be 1-191 characters"))]
    pub template: String,

    /// Placeholder → value pairs, e.g. `"{task_name}" → "Ship it"`.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Body sent to webhooks.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Link appended to chat messages.
    #[serde(default)]
    pub url: Option<String>,

    /// Slack incoming-webhook URL to use instead of the tenant's.
    #[serde(default)]
    pub slack_webhook_url: Option<String>,

    /// Telegram chat to post to instead of the tenant's.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

/// Why a send was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoWebhook,
    NoTemplate,
    NotActivated,
    MissingCredentials,
    Bootstrapping,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoWebhook => write!(f, "no_webhook"),
            SkipReason::NoTemplate => write!(f, "no_template"),
            SkipReason::NotActivated => write!(f, "not_activated"),
            SkipReason::MissingCredentials => write!(f, "missing_credentials"),
            SkipReason::Bootstrapping => write!(f, "bootstrapping"),
        }
    }
}

/// Terminal outcome of a single send. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchResult {
    /// Destination answered with HTTP 200 (or the mail relay accepted).
    Delivered { status: u16 },
    /// Configuration missing; no call attempted.
    Skipped { reason: SkipReason },
    /// Destination failed URL safety checks; no call attempted.
    Rejected { url: String },
    /// Transport error or non-200 response.
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        error: String,
    },
}

impl DispatchResult {
    pub fn skipped(reason: SkipReason) -> Self {
        DispatchResult::Skipped { reason }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchResult::Delivered { .. })
    }
}

/// Outcome of one channel within a dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub result: DispatchResult,
}

/// Request payload for a templated email.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendEmailRequest {
    #[validate(length(min = 1, max = 191, message = "Template must be 1-191 characters"))]
    pub template: String,

    #[validate(email(message = "Invalid email address"))]
    pub to: String,

    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Language variant; defaults to the tenant's `defaultLanguage`.
    #[serde(default)]
    pub lang: Option<String>,
}
