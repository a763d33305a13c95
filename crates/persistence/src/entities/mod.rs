//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod notification_template;
pub mod setting;
pub mod user;
pub mod webhook;

pub use notification_template::{
    NotificationChannelDb, NotificationTemplateEntity, NotificationTemplateLangEntity,
};
pub use setting::SettingEntity;
pub use user::UserEntity;
pub use webhook::{WebhookEntity, WebhookMethodDb};
