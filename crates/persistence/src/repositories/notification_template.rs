//! Notification template repository for database operations.

use async_trait::async_trait;
use domain::models::{
    NotificationChannel, NotificationTemplate, NotificationTemplateLang, GLOBAL_TEMPLATE_OWNER,
};
use domain::services::TemplateStore;
use domain::StoreError;
use sqlx::PgPool;

use crate::entities::{
    NotificationChannelDb, NotificationTemplateEntity, NotificationTemplateLangEntity,
};
use crate::metrics::{timed, QueryTimer};

/// Repository for notification templates and their activation flags.
#[derive(Clone)]
pub struct NotificationTemplateRepository {
    pool: PgPool,
}

impl NotificationTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for NotificationTemplateRepository {
    async fn find_template(
        &self,
        name: &str,
        channel: NotificationChannel,
        owner_id: i64,
    ) -> Result<Option<NotificationTemplate>, StoreError> {
        let entity = timed(
            "template_find",
            sqlx::query_as::<_, NotificationTemplateEntity>(
                r#"
                SELECT id, name, channel, created_by
                FROM notification_templates
                WHERE name = $1 AND channel = $2 AND created_by = $3
                "#,
            )
            .bind(name)
            .bind(NotificationChannelDb::from(channel))
            .bind(owner_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(entity.map(Into::into))
    }

    async fn find_template_by_id(&self, id: i64) -> Result<Option<NotificationTemplate>, StoreError> {
        let entity = timed(
            "template_find_by_id",
            sqlx::query_as::<_, NotificationTemplateEntity>(
                "SELECT id, name, channel, created_by FROM notification_templates WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(entity.map(Into::into))
    }

    async fn find_lang(
        &self,
        template_id: i64,
        lang: &str,
    ) -> Result<Option<NotificationTemplateLang>, StoreError> {
        let entity = timed(
            "template_find_lang",
            sqlx::query_as::<_, NotificationTemplateLangEntity>(
                r#"
                SELECT template_id, lang, subject, from_name, content
                FROM notification_template_langs
                WHERE template_id = $1 AND lang = $2
                "#,
            )
            .bind(template_id)
            .bind(lang)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(entity.map(Into::into))
    }

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<NotificationTemplate>, StoreError> {
        let rows = timed(
            "template_list_for_owner",
            sqlx::query_as::<_, NotificationTemplateEntity>(
                r#"
                SELECT id, name, channel, created_by
                FROM notification_templates
                WHERE created_by = $1
                ORDER BY channel, name
                "#,
            )
            .bind(owner_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn is_active(
        &self,
        user_id: i64,
        template_id: i64,
        channel: NotificationChannel,
    ) -> Result<bool, StoreError> {
        let active: Option<bool> = timed(
            "template_is_active",
            sqlx::query_scalar(
                r#"
                SELECT is_active
                FROM user_notification_templates
                WHERE user_id = $1 AND template_id = $2 AND channel = $3
                "#,
            )
            .bind(user_id)
            .bind(template_id)
            .bind(NotificationChannelDb::from(channel))
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(active.unwrap_or(false))
    }

    async fn set_active(
        &self,
        user_id: i64,
        template_id: i64,
        channel: NotificationChannel,
        active: bool,
    ) -> Result<(), StoreError> {
        timed(
            "template_set_active",
            sqlx::query(
                r#"
                INSERT INTO user_notification_templates (user_id, template_id, channel, is_active)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT ON CONSTRAINT user_notification_templates_unique
                DO UPDATE SET is_active = EXCLUDED.is_active, updated_at = NOW()
                "#,
            )
            .bind(user_id)
            .bind(template_id)
            .bind(NotificationChannelDb::from(channel))
            .bind(active)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn copy_global_templates(&self, owner_id: i64) -> Result<usize, StoreError> {
        if owner_id == GLOBAL_TEMPLATE_OWNER {
            return Ok(0);
        }

        let timer = QueryTimer::new("template_copy_global");
        let result = copy_global_templates_tx(&self.pool, owner_id).await;
        timer.finish(&result);
        Ok(result?)
    }
}

/// Copies templates, language variants and inactive activation rows in one
/// transaction so a tenant never sees a half-provisioned set.
async fn copy_global_templates_tx(pool: &PgPool, owner_id: i64) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let copied: Vec<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO notification_templates (name, channel, created_by)
        SELECT g.name, g.channel, $1
        FROM notification_templates g
        WHERE g.created_by = $2
          AND NOT EXISTS (
              SELECT 1 FROM notification_templates t
              WHERE t.created_by = $1 AND t.name = g.name AND t.channel = g.channel
          )
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(GLOBAL_TEMPLATE_OWNER)
    .fetch_all(&mut *tx)
    .await?;

    if copied.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    sqlx::query(
        r#"
        INSERT INTO notification_template_langs (template_id, lang, subject, from_name, content)
        SELECT t.id, l.lang, l.subject, l.from_name, l.content
        FROM notification_templates t
        JOIN notification_templates g
          ON g.name = t.name AND g.channel = t.channel AND g.created_by = $2
        JOIN notification_template_langs l ON l.template_id = g.id
        WHERE t.id = ANY($1)
        "#,
    )
    .bind(&copied)
    .bind(GLOBAL_TEMPLATE_OWNER)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_notification_templates (user_id, template_id, channel, is_active)
        SELECT $1, t.id, t.channel, FALSE
        FROM notification_templates t
        WHERE t.id = ANY($2)
        ON CONFLICT ON CONSTRAINT user_notification_templates_unique DO NOTHING
        "#,
    )
    .bind(owner_id)
    .bind(&copied)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(owner_id = owner_id, copied = copied.len(), "Provisioned notification templates");

    Ok(copied.len())
}
