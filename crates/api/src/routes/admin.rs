//! Super admin endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use domain::models::UserRole;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthenticatedTenant;

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub user_id: i64,
    /// Templates copied by this call; zero when the tenant already had them.
    pub copied: usize,
}

/// POST /api/v1/admin/tenants/:user_id/provision
///
/// Copies the global notification templates to a company account. Safe to
/// repeat.
pub async fn provision_tenant(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(user_id): Path<i64>,
) -> Result<Json<ProvisionResponse>, ApiError> {
    let tenant = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if tenant.role != UserRole::Company {
        return Err(ApiError::Validation(
            "Only company accounts can be provisioned".to_string(),
        ));
    }

    let copied = state.templates.copy_global_templates(tenant.id).await?;

    info!(
        admin_id = ?ctx.principal.as_ref().map(|p| p.id),
        user_id = tenant.id,
        copied,
        "Tenant templates provisioned"
    );

    Ok(Json(ProvisionResponse {
        user_id: tenant.id,
        copied,
    }))
}
