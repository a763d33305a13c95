//! Scoped key/value settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Resolved settings for one scope, ordered by key.
pub type SettingsMap = BTreeMap<String, String>;

/// Well-known setting keys.
pub mod keys {
    pub const DEFAULT_LANGUAGE: &str = "defaultLanguage";
    pub const APP_NAME: &str = "app_name";

    pub const SLACK_WEBHOOK_URL: &str = "slack_webhook_url";
    pub const TELEGRAM_BOT_TOKEN: &str = "telegram_bot_token";
    pub const TELEGRAM_CHAT_ID: &str = "telegram_chat_id";

    pub const MAIL_HOST: &str = "mail_host";
    pub const MAIL_PORT: &str = "mail_port";
    pub const MAIL_USERNAME: &str = "mail_username";
    pub const MAIL_PASSWORD: &str = "mail_password";
    pub const MAIL_ENCRYPTION: &str = "mail_encryption";
    pub const MAIL_FROM_ADDRESS: &str = "mail_from_address";
    pub const MAIL_FROM_NAME: &str = "mail_from_name";
}

/// Keys whose values are credentials. Only integration managers see them.
pub const SECRET_KEYS: &[&str] = &[
    keys::SLACK_WEBHOOK_URL,
    keys::TELEGRAM_BOT_TOKEN,
    keys::MAIL_USERNAME,
    keys::MAIL_PASSWORD,
];

/// Shown in place of a stored secret.
pub const MASKED_VALUE: &str = "********";

/// Replaces non-empty secret values with [`MASKED_VALUE`].
pub fn mask_secrets(settings: &mut SettingsMap) {
    for key in SECRET_KEYS {
        if let Some(value) = settings.get_mut(*key) {
            if !value.is_empty() {
                *value = MASKED_VALUE.to_string();
            }
        }
    }
}

/// Fallback language when neither settings nor the principal name one.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Which key/value table a setting lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsKind {
    General,
    Payment,
}

impl std::fmt::Display for SettingsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsKind::General => write!(f, "general"),
            SettingsKind::Payment => write!(f, "payment"),
        }
    }
}

/// A single stored setting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub user_id: i64,
    /// `None` marks a tenant-wide default.
    pub workspace_id: Option<i64>,
    pub key: String,
    pub value: String,
}

/// Request payload for upserting settings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(custom(function = "validate_setting_entries"))]
    pub settings: BTreeMap<String, String>,

    /// Store under the tenant-wide scope regardless of the caller's workspace.
    #[serde(default)]
    pub ignore_workspace: bool,

    #[serde(default)]
    pub workspace_id: Option<i64>,
}

/// Maximum key length accepted by the settings tables.
pub const MAX_KEY_LENGTH: usize = 191;

fn validate_setting_entries(
    settings: &BTreeMap<String, String>,
) -> Result<(), validator::ValidationError> {
    if settings.is_empty() {
        let mut err = validator::ValidationError::new("empty");
        err.message = Some("At least one setting is required".into());
        return Err(err);
    }
    for key in settings.keys() {
        if key.trim().is_empty() || key.len() > MAX_KEY_LENGTH {
            let mut err = validator::ValidationError::new("invalid_key");
            err.message = Some(format!("Setting keys must be 1-{} characters", MAX_KEY_LENGTH).into());
            return Err(err);
        }
    }
    Ok(())
}
