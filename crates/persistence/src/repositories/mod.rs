//! Repository implementations of the domain storage traits.

pub mod notification_template;
pub mod setting;
pub mod user;
pub mod webhook;

pub use notification_template::NotificationTemplateRepository;
pub use setting::SettingRepository;
pub use user::UserRepository;
pub use webhook::WebhookRepository;
