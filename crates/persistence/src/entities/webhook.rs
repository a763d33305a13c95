//! Webhook entity (database row mapping).

use domain::models::{Webhook, WebhookMethod};
use sqlx::FromRow;

/// Database enum for webhook_method that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "webhook_method", rename_all = "UPPERCASE")]
pub enum WebhookMethodDb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<WebhookMethodDb> for WebhookMethod {
    fn from(db: WebhookMethodDb) -> Self {
        match db {
            WebhookMethodDb::Get => WebhookMethod::Get,
            WebhookMethodDb::Post => WebhookMethod::Post,
            WebhookMethodDb::Put => WebhookMethod::Put,
            WebhookMethodDb::Patch => WebhookMethod::Patch,
            WebhookMethodDb::Delete => WebhookMethod::Delete,
        }
    }
}

impl From<WebhookMethod> for WebhookMethodDb {
    fn from(method: WebhookMethod) -> Self {
        match method {
            WebhookMethod::Get => WebhookMethodDb::Get,
            WebhookMethod::Post => WebhookMethodDb::Post,
            WebhookMethod::Put => WebhookMethodDb::Put,
            WebhookMethod::Patch => WebhookMethodDb::Patch,
            WebhookMethod::Delete => WebhookMethodDb::Delete,
        }
    }
}

/// Database row mapping for the webhooks table.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEntity {
    pub id: i64,
    pub user_id: i64,
    pub workspace_id: Option<i64>,
    pub module: String,
    pub url: String,
    pub method: WebhookMethodDb,
}

impl From<WebhookEntity> for Webhook {
    fn from(entity: WebhookEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            workspace_id: entity.workspace_id,
            module: entity.module,
            url: entity.url,
            method: entity.method.into(),
        }
    }
}
