//! Notification template entities (database row mappings).

use domain::models::{NotificationChannel, NotificationTemplate, NotificationTemplateLang};
use sqlx::FromRow;

/// Database enum for notification_channel that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_channel", rename_all = "lowercase")]
pub enum NotificationChannelDb {
    Email,
    Slack,
    Telegram,
}

impl From<NotificationChannelDb> for NotificationChannel {
    fn from(db: NotificationChannelDb) -> Self {
        match db {
            NotificationChannelDb::Email => NotificationChannel::Email,
            NotificationChannelDb::Slack => NotificationChannel::Slack,
            NotificationChannelDb::Telegram => NotificationChannel::Telegram,
        }
    }
}

impl From<NotificationChannel> for NotificationChannelDb {
    fn from(channel: NotificationChannel) -> Self {
        match channel {
            NotificationChannel::Email => NotificationChannelDb::Email,
            NotificationChannel::Slack => NotificationChannelDb::Slack,
            NotificationChannel::Telegram => NotificationChannelDb::Telegram,
        }
    }
}

/// Database row mapping for the notification_templates table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationTemplateEntity {
    pub id: i64,
    pub name: String,
    pub channel: NotificationChannelDb,
    pub created_by: i64,
}

impl From<NotificationTemplateEntity> for NotificationTemplate {
    fn from(entity: NotificationTemplateEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            channel: entity.channel.into(),
            created_by: entity.created_by,
        }
    }
}

/// Database row mapping for the notification_template_langs table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationTemplateLangEntity {
    pub template_id: i64,
    pub lang: String,
    pub subject: String,
    pub from_name: Option<String>,
    pub content: String,
}

impl From<NotificationTemplateLangEntity> for NotificationTemplateLang {
    fn from(entity: NotificationTemplateLangEntity) -> Self {
        Self {
            template_id: entity.template_id,
            lang: entity.lang,
            subject: entity.subject,
            from: entity.from_name,
            content: entity.content,
        }
    }
}
