//! Webhook subscription endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use domain::models::{CreateWebhookRequest, NewWebhook, Webhook};
use shared::url_safety::check_outbound_url;

use super::{require_manager, resolve_scope, ScopeQuery};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthenticatedTenant;

#[derive(Debug, Serialize)]
pub struct ListWebhooksResponse {
    pub data: Vec<Webhook>,
}

/// GET /api/v1/webhooks
pub async fn list_webhooks(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<ListWebhooksResponse>, ApiError> {
    let scope = resolve_scope(&state.resolver, &ctx, query.scope()).await?;
    let data = state
        .webhooks
        .list(scope.user_id, scope.workspace_id)
        .await?;

    Ok(Json(ListWebhooksResponse { data }))
}

/// POST /api/v1/webhooks
///
/// The URL must pass the outbound safety check now; it is checked again on
/// every send since DNS can change.
pub async fn create_webhook(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(request): Json<CreateWebhookRequest>,
) -> Result<(StatusCode, Json<Webhook>), ApiError> {
    request.validate()?;
    require_manager(&ctx)?;

    if let Err(reason) = check_outbound_url(&request.url, state.config.outbound.policy()).await {
        warn!(target_url = %request.url, reason = %reason, "Webhook URL rejected");
        return Err(ApiError::Validation(format!(
            "Webhook URL is not allowed: {}",
            reason
        )));
    }

    let scope = resolve_scope(&state.resolver, &ctx, Default::default()).await?;
    let webhook = state
        .webhooks
        .create(NewWebhook {
            user_id: scope.user_id,
            workspace_id: request.workspace_id,
            module: request.module.trim().to_string(),
            url: request.url.trim().to_string(),
            method: request.method,
        })
        .await?;

    info!(
        webhook_id = webhook.id,
        user_id = webhook.user_id,
        module = %webhook.module,
        "Webhook created"
    );

    Ok((StatusCode::CREATED, Json(webhook)))
}

/// DELETE /api/v1/webhooks/:webhook_id
pub async fn delete_webhook(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(webhook_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_manager(&ctx)?;
    let scope = resolve_scope(&state.resolver, &ctx, Default::default()).await?;

    if !state.webhooks.delete(scope.user_id, webhook_id).await? {
        return Err(ApiError::NotFound("Webhook not found".to_string()));
    }

    info!(webhook_id, user_id = scope.user_id, "Webhook deleted");
    Ok(StatusCode::NO_CONTENT)
}
