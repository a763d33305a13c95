//! In-memory storage for development and testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{SettingsStore, TemplateStore, UserDirectory, WebhookStore};
use crate::error::StoreError;
use crate::models::{
    NewWebhook, NotificationChannel, NotificationTemplate, NotificationTemplateLang,
    SettingsKind, SettingsMap, User, UserRole, Webhook, GLOBAL_TEMPLATE_OWNER,
};

type SettingKey = (SettingsKind, i64, Option<i64>);

/// Implements every storage trait over process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    settings: RwLock<HashMap<SettingKey, SettingsMap>>,
    webhooks: RwLock<Vec<Webhook>>,
    templates: RwLock<Vec<NotificationTemplate>>,
    langs: RwLock<Vec<NotificationTemplateLang>>,
    activations: RwLock<HashMap<(i64, i64, NotificationChannel), bool>>,
    next_id: AtomicI64,
    settings_loads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.users.write().await.push(user);
    }

    pub async fn add_template(&self, template: NotificationTemplate, langs: Vec<NotificationTemplateLang>) {
        self.templates.write().await.push(template);
        self.langs.write().await.extend(langs);
    }

    /// Number of `load` calls served, for cache assertions.
    pub fn settings_loads(&self) -> usize {
        self.settings_loads.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> i64 {
        // Ids start above anything a test is likely to seed by hand.
        1000 + self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn first_with_role(&self, role: UserRole) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.role == role)
            .min_by_key(|u| u.id)
            .cloned())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn load(
        &self,
        kind: SettingsKind,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> Result<SettingsMap, StoreError> {
        self.settings_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .settings
            .read()
            .await
            .get(&(kind, user_id, workspace_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        kind: SettingsKind,
        user_id: i64,
        workspace_id: Option<i64>,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.settings
            .write()
            .await
            .entry((kind, user_id, workspace_id))
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl WebhookStore for InMemoryStore {
    async fn find_for_module(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
        module: &str,
    ) -> Result<Vec<Webhook>, StoreError> {
        Ok(self
            .webhooks
            .read()
            .await
            .iter()
            .filter(|w| {
                w.user_id == user_id
                    && w.module == module
                    && (w.workspace_id.is_none() || w.workspace_id == workspace_id)
            })
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> Result<Vec<Webhook>, StoreError> {
        Ok(self
            .webhooks
            .read()
            .await
            .iter()
            .filter(|w| {
                w.user_id == user_id
                    && (w.workspace_id.is_none() || w.workspace_id == workspace_id)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, webhook: NewWebhook) -> Result<Webhook, StoreError> {
        let created = Webhook {
            id: self.allocate_id(),
            user_id: webhook.user_id,
            workspace_id: webhook.workspace_id,
            module: webhook.module,
            url: webhook.url,
            method: webhook.method,
        };
        self.webhooks.write().await.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut webhooks = self.webhooks.write().await;
        let before = webhooks.len();
        webhooks.retain(|w| !(w.id == id && w.user_id == user_id));
        Ok(webhooks.len() != before)
    }
}

#[async_trait]
impl TemplateStore for InMemoryStore {
    async fn find_template(
        &self,
        name: &str,
        channel: NotificationChannel,
        owner_id: i64,
    ) -> Result<Option<NotificationTemplate>, StoreError> {
        Ok(self
            .templates
            .read()
            .await
            .iter()
            .find(|t| t.name == name && t.channel == channel && t.created_by == owner_id)
            .cloned())
    }

    async fn find_template_by_id(&self, id: i64) -> Result<Option<NotificationTemplate>, StoreError> {
        Ok(self.templates.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn find_lang(
        &self,
        template_id: i64,
        lang: &str,
    ) -> Result<Option<NotificationTemplateLang>, StoreError> {
        Ok(self
            .langs
            .read()
            .await
            .iter()
            .find(|l| l.template_id == template_id && l.lang == lang)
            .cloned())
    }

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<NotificationTemplate>, StoreError> {
        Ok(self
            .templates
            .read()
            .await
            .iter()
            .filter(|t| t.created_by == owner_id)
            .cloned()
            .collect())
    }

    async fn is_active(
        &self,
        user_id: i64,
        template_id: i64,
        channel: NotificationChannel,
    ) -> Result<bool, StoreError> {
        Ok(self
            .activations
            .read()
            .await
            .get(&(user_id, template_id, channel))
            .copied()
            .unwrap_or(false))
    }

    async fn set_active(
        &self,
        user_id: i64,
        template_id: i64,
        channel: NotificationChannel,
        active: bool,
    ) -> Result<(), StoreError> {
        self.activations
            .write()
            .await
            .insert((user_id, template_id, channel), active);
        Ok(())
    }

    async fn copy_global_templates(&self, owner_id: i64) -> Result<usize, StoreError> {
        if owner_id == GLOBAL_TEMPLATE_OWNER {
            return Ok(0);
        }

        let mut templates = self.templates.write().await;
        let mut langs = self.langs.write().await;
        let mut activations = self.activations.write().await;

        let globals: Vec<NotificationTemplate> = templates
            .iter()
            .filter(|t| t.created_by == GLOBAL_TEMPLATE_OWNER)
            .cloned()
            .collect();

        let mut copied = 0;
        for global in globals {
            let exists = templates.iter().any(|t| {
                t.created_by == owner_id && t.name == global.name && t.channel == global.channel
            });
            if exists {
                continue;
            }

            let id = self.allocate_id();
            let variants: Vec<NotificationTemplateLang> = langs
                .iter()
                .filter(|l| l.template_id == global.id)
                .map(|l| NotificationTemplateLang {
                    template_id: id,
                    ..l.clone()
                })
                .collect();
            langs.extend(variants);
            templates.push(NotificationTemplate {
                id,
                created_by: owner_id,
                ..global.clone()
            });
            activations.insert((owner_id, id, global.channel), false);
            copied += 1;
        }

        Ok(copied)
    }
}
