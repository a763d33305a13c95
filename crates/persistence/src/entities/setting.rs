//! Setting entity (database row mapping).

use domain::models::{Setting, SettingsKind};
use sqlx::FromRow;

/// Table backing a settings kind.
pub fn table_for(kind: SettingsKind) -> &'static str {
    match kind {
        SettingsKind::General => "settings",
        SettingsKind::Payment => "payment_settings",
    }
}

/// Unique constraint used for upserts into [`table_for`].
pub fn scope_constraint_for(kind: SettingsKind) -> &'static str {
    match kind {
        SettingsKind::General => "settings_scope_key_unique",
        SettingsKind::Payment => "payment_settings_scope_key_unique",
    }
}

/// Database row mapping for the settings and payment_settings tables.
#[derive(Debug, Clone, FromRow)]
pub struct SettingEntity {
    pub user_id: i64,
    pub workspace_id: Option<i64>,
    pub key: String,
    pub value: String,
}

impl From<SettingEntity> for Setting {
    fn from(entity: SettingEntity) -> Self {
        Self {
            user_id: entity.user_id,
            workspace_id: entity.workspace_id,
            key: entity.key,
            value: entity.value,
        }
    }
}
