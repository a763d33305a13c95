//! Setting repository for database operations.

use async_trait::async_trait;
use domain::models::{SettingsKind, SettingsMap};
use domain::services::SettingsStore;
use domain::StoreError;
use sqlx::PgPool;

use crate::entities::setting::{scope_constraint_for, table_for};
use crate::entities::SettingEntity;
use crate::metrics::timed;

/// Repository for the scoped settings tables.
#[derive(Clone)]
pub struct SettingRepository {
    pool: PgPool,
}

impl SettingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SettingRepository {
    async fn load(
        &self,
        kind: SettingsKind,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> Result<SettingsMap, StoreError> {
        // IS NOT DISTINCT FROM matches a NULL workspace against NULL.
        let sql = format!(
            r#"
            SELECT user_id, workspace_id, key, value
            FROM {}
            WHERE user_id = $1 AND workspace_id IS NOT DISTINCT FROM $2
            "#,
            table_for(kind)
        );

        let rows = timed(
            "settings_load",
            sqlx::query_as::<_, SettingEntity>(&sql)
                .bind(user_id)
                .bind(workspace_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    async fn upsert(
        &self,
        kind: SettingsKind,
        user_id: i64,
        workspace_id: Option<i64>,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            INSERT INTO {} (user_id, workspace_id, key, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT {}
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
            table_for(kind),
            scope_constraint_for(kind)
        );

        timed(
            "settings_upsert",
            sqlx::query(&sql)
                .bind(user_id)
                .bind(workspace_id)
                .bind(key)
                .bind(value)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }
}
