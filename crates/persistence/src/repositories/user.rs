//! User repository for database operations.

use async_trait::async_trait;
use domain::models::{User, UserRole};
use domain::services::UserDirectory;
use domain::StoreError;
use sqlx::PgPool;

use crate::entities::UserEntity;
use crate::metrics::timed;

/// Repository for user lookups.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stored account types that map to a role.
    fn stored_types(role: UserRole) -> &'static [&'static str] {
        match role {
            UserRole::SuperAdmin => &["super_admin", "super admin"],
            UserRole::Company => &["company"],
            UserRole::Member => &[],
        }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let entity = timed(
            "user_find_by_id",
            sqlx::query_as::<_, UserEntity>(
                r#"
                SELECT id, name, email, type AS role, created_by, current_workspace_id, lang
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(entity.map(Into::into))
    }

    async fn first_with_role(&self, role: UserRole) -> Result<Option<User>, StoreError> {
        let entity = match role {
            // Members have no fixed stored type: anything that is neither a
            // super admin nor a company.
            UserRole::Member => {
                timed(
                    "user_first_member",
                    sqlx::query_as::<_, UserEntity>(
                        r#"
                        SELECT id, name, email, type AS role, created_by, current_workspace_id, lang
                        FROM users
                        WHERE type NOT IN ('super_admin', 'super admin', 'company')
                        ORDER BY id
                        LIMIT 1
                        "#,
                    )
                    .fetch_optional(&self.pool),
                )
                .await?
            }
            _ => {
                let types: Vec<String> = Self::stored_types(role)
                    .iter()
                    .map(|t| t.to_string())
                    .collect();
                timed(
                    "user_first_with_role",
                    sqlx::query_as::<_, UserEntity>(
                        r#"
                        SELECT id, name, email, type AS role, created_by, current_workspace_id, lang
                        FROM users
                        WHERE type = ANY($1)
                        ORDER BY id
                        LIMIT 1
                        "#,
                    )
                    .bind(types)
                    .fetch_optional(&self.pool),
                )
                .await?
            }
        };

        Ok(entity.map(Into::into))
    }
}
