//! Domain models for the dispatch gateway.

pub mod calendar;
pub mod dispatch;
pub mod notification_template;
pub mod payment_gateway;
pub mod setting;
pub mod tenant;
pub mod webhook;

pub use calendar::{CalendarDispatchRequest, CalendarEntry, CalendarSource};
pub use dispatch::{ChannelOutcome, DispatchEvent, DispatchResult, SendEmailRequest, SkipReason};
pub use notification_template::{
    NotificationChannel, NotificationTemplate, NotificationTemplateLang, TemplateActivation,
    UpdateActivationRequest, GLOBAL_TEMPLATE_OWNER,
};
pub use setting::{Setting, SettingsKind, SettingsMap, UpdateSettingsRequest};
pub use tenant::{ResolvedScope, ScopeRequest, TenantContext, TenantMode, User, UserRole};
pub use webhook::{CreateWebhookRequest, NewWebhook, Webhook, WebhookMethod};
