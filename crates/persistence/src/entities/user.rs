//! User entity (database row mapping).

use domain::models::{User, UserRole};
use sqlx::FromRow;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Stored account type, selected as `type AS role`.
    pub role: String,
    pub created_by: Option<i64>,
    pub current_workspace_id: Option<i64>,
    pub lang: Option<String>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            role: UserRole::parse(&entity.role),
            created_by: entity.created_by,
            current_workspace_id: entity.current_workspace_id,
            lang: entity.lang,
        }
    }
}
