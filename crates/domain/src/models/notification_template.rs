//! Notification template models.

use serde::{Deserialize, Serialize};

/// Owner of the seeded templates every tenant copies at provisioning.
pub const GLOBAL_TEMPLATE_OWNER: i64 = 1;

/// Delivery channel a template is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Slack,
    Telegram,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Slack => "slack",
            NotificationChannel::Telegram => "telegram",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" | "mail" => Some(NotificationChannel::Email),
            "slack" => Some(NotificationChannel::Slack),
            "telegram" => Some(NotificationChannel::Telegram),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub id: i64,
    pub name: String,
    pub channel: NotificationChannel,
    pub created_by: i64,
}

/// Language-specific content of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplateLang {
    pub template_id: i64,
    pub lang: String,
    /// Subject line for email, title for chat channels.
    pub subject: String,
    /// Sender display name (email only).
    pub from: Option<String>,
    pub content: String,
}

/// Template listed together with the tenant's activation flag.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateActivation {
    #[serde(flatten)]
    pub template: NotificationTemplate,
    pub is_active: bool,
}

/// Request payload for toggling a template.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateActivationRequest {
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parse_and_display() {
        assert_eq!(NotificationChannel::parse("Slack"), Some(NotificationChannel::Slack));
        assert_eq!(NotificationChannel::parse("mail"), Some(NotificationChannel::Email));
        assert_eq!(NotificationChannel::parse("sms"), None);
        assert_eq!(NotificationChannel::Telegram.to_string(), "telegram");
    }

    #[test]
    fn test_activation_serializes_flat() {
        let item = TemplateActivation {
            template: NotificationTemplate {
                id: 3,
                name: "New Task".to_string(),
                channel: NotificationChannel::Slack,
                created_by: 2,
            },
            is_active: false,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["name"], "New Task");
        assert_eq!(json["channel"], "slack");
        assert_eq!(json["is_active"], false);
    }
}
