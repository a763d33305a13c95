//! Storage traits the domain services depend on.
//!
//! PostgreSQL implementations live in the persistence crate; an in-memory
//! implementation for tests lives in [`super::memory`].

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    NewWebhook, NotificationChannel, NotificationTemplate, NotificationTemplateLang,
    SettingsKind, SettingsMap, User, UserRole, Webhook,
};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Lowest-id user with the given role.
    async fn first_with_role(&self, role: UserRole) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Rows stored for exactly `(user_id, workspace_id)`.
    async fn load(
        &self,
        kind: SettingsKind,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> Result<SettingsMap, StoreError>;

    /// Inserts or replaces the value for `(user_id, workspace_id, key)`.
    async fn upsert(
        &self,
        kind: SettingsKind,
        user_id: i64,
        workspace_id: Option<i64>,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Webhooks of `module` for the tenant, including tenant-wide ones.
    async fn find_for_module(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
        module: &str,
    ) -> Result<Vec<Webhook>, StoreError>;

    async fn list(&self, user_id: i64, workspace_id: Option<i64>)
        -> Result<Vec<Webhook>, StoreError>;

    async fn create(&self, webhook: NewWebhook) -> Result<Webhook, StoreError>;

    /// Returns `false` when no webhook with that id belongs to the user.
    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find_template(
        &self,
        name: &str,
        channel: NotificationChannel,
        owner_id: i64,
    ) -> Result<Option<NotificationTemplate>, StoreError>;

    async fn find_template_by_id(&self, id: i64) -> Result<Option<NotificationTemplate>, StoreError>;

    async fn find_lang(
        &self,
        template_id: i64,
        lang: &str,
    ) -> Result<Option<NotificationTemplateLang>, StoreError>;

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<NotificationTemplate>, StoreError>;

    async fn is_active(
        &self,
        user_id: i64,
        template_id: i64,
        channel: NotificationChannel,
    ) -> Result<bool, StoreError>;

    async fn set_active(
        &self,
        user_id: i64,
        template_id: i64,
        channel: NotificationChannel,
        active: bool,
    ) -> Result<(), StoreError>;

    /// Copies the global templates and their language variants to `owner_id`
    /// and records an inactive activation row for each. Templates the owner
    /// already has are left alone. Returns the number copied.
    async fn copy_global_templates(&self, owner_id: i64) -> Result<usize, StoreError>;
}
