//! Tenant settings endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use domain::models::setting::mask_secrets;
use domain::models::{ResolvedScope, SettingsMap, UpdateSettingsRequest};

use super::{require_manager, resolve_scope, ScopeQuery};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthenticatedTenant;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub scope: ResolvedScope,
    pub settings: SettingsMap,
}

/// GET /api/v1/settings
///
/// Members get credential values masked.
pub async fn get_settings(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let scope = resolve_scope(&state.resolver, &ctx, query.scope()).await?;
    let mut settings = state.resolver.all(&ctx, query.scope()).await?;
    if require_manager(&ctx).is_err() {
        mask_secrets(&mut settings);
    }

    Ok(Json(SettingsResponse { scope, settings }))
}

/// PUT /api/v1/settings
///
/// Upserts every entry into one scope and returns the merged view.
pub async fn update_settings(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    request.validate()?;
    require_manager(&ctx)?;

    let query = ScopeQuery {
        workspace_id: request.workspace_id,
    };
    let scope = resolve_scope(&state.resolver, &ctx, query.scope()).await?;

    let entries: Vec<(&str, &str)> = request
        .settings
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let written = state
        .resolver
        .set_many(&ctx, &entries, query.scope(), request.ignore_workspace)
        .await?;
    if !written {
        return Err(ApiError::ServiceUnavailable(
            "Installation in progress".to_string(),
        ));
    }

    info!(
        user_id = scope.user_id,
        workspace_id = ?scope.workspace_id,
        ignore_workspace = request.ignore_workspace,
        count = request.settings.len(),
        "Settings updated"
    );

    let settings = state.resolver.all(&ctx, query.scope()).await?;
    Ok(Json(SettingsResponse { scope, settings }))
}
