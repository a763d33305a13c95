//! Webhook repository for database operations.

use async_trait::async_trait;
use domain::models::{NewWebhook, Webhook};
use domain::services::WebhookStore;
use domain::StoreError;
use sqlx::PgPool;

use crate::entities::{WebhookEntity, WebhookMethodDb};
use crate::metrics::timed;

/// Repository for webhook-related database operations.
#[derive(Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    /// Creates a new WebhookRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookStore for WebhookRepository {
    async fn find_for_module(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
        module: &str,
    ) -> Result<Vec<Webhook>, StoreError> {
        let rows = timed(
            "webhook_find_for_module",
            sqlx::query_as::<_, WebhookEntity>(
                r#"
                SELECT id, user_id, workspace_id, module, url, method
                FROM webhooks
                WHERE user_id = $1
                  AND module = $2
                  AND (workspace_id IS NULL OR workspace_id IS NOT DISTINCT FROM $3)
                ORDER BY id
                "#,
            )
            .bind(user_id)
            .bind(module)
            .bind(workspace_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> Result<Vec<Webhook>, StoreError> {
        let rows = timed(
            "webhook_list",
            sqlx::query_as::<_, WebhookEntity>(
                r#"
                SELECT id, user_id, workspace_id, module, url, method
                FROM webhooks
                WHERE user_id = $1
                  AND (workspace_id IS NULL OR workspace_id IS NOT DISTINCT FROM $2)
                ORDER BY module, id
                "#,
            )
            .bind(user_id)
            .bind(workspace_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, webhook: NewWebhook) -> Result<Webhook, StoreError> {
        let entity = timed(
            "webhook_create",
            sqlx::query_as::<_, WebhookEntity>(
                r#"
                INSERT INTO webhooks (user_id, workspace_id, module, url, method)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, user_id, workspace_id, module, url, method
                "#,
            )
            .bind(webhook.user_id)
            .bind(webhook.workspace_id)
            .bind(&webhook.module)
            .bind(&webhook.url)
            .bind(WebhookMethodDb::from(webhook.method))
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(entity.into())
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let result = timed(
            "webhook_delete",
            sqlx::query("DELETE FROM webhooks WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
