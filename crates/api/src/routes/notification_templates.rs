//! Notification template listing and per-tenant activation.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use domain::models::{
    NotificationTemplate, TemplateActivation, UpdateActivationRequest, GLOBAL_TEMPLATE_OWNER,
};

use super::{require_manager, resolve_scope};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthenticatedTenant;

#[derive(Debug, Serialize)]
pub struct ListTemplatesResponse {
    pub data: Vec<TemplateActivation>,
}

/// GET /api/v1/notification-templates
///
/// The tenant's own templates plus any global template it has no copy of,
/// each with the tenant's activation flag.
pub async fn list_templates(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
) -> Result<Json<ListTemplatesResponse>, ApiError> {
    let scope = resolve_scope(&state.resolver, &ctx, Default::default()).await?;

    let mut templates = state.templates.list_for_owner(scope.user_id).await?;
    if scope.user_id != GLOBAL_TEMPLATE_OWNER {
        let globals = state.templates.list_for_owner(GLOBAL_TEMPLATE_OWNER).await?;
        let shadowed = |g: &NotificationTemplate| {
            templates
                .iter()
                .any(|t| t.name == g.name && t.channel == g.channel)
        };
        let missing: Vec<_> = globals.into_iter().filter(|g| !shadowed(g)).collect();
        templates.extend(missing);
    }

    let mut data = Vec::with_capacity(templates.len());
    for template in templates {
        let is_active = state
            .templates
            .is_active(scope.user_id, template.id, template.channel)
            .await?;
        data.push(TemplateActivation {
            template,
            is_active,
        });
    }

    Ok(Json(ListTemplatesResponse { data }))
}

/// PUT /api/v1/notification-templates/:template_id/activation
pub async fn update_activation(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(template_id): Path<i64>,
    Json(request): Json<UpdateActivationRequest>,
) -> Result<Json<TemplateActivation>, ApiError> {
    require_manager(&ctx)?;
    let scope = resolve_scope(&state.resolver, &ctx, Default::default()).await?;

    let template = state
        .templates
        .find_template_by_id(template_id)
        .await?
        .filter(|t| t.created_by == scope.user_id || t.created_by == GLOBAL_TEMPLATE_OWNER)
        .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;

    state
        .templates
        .set_active(scope.user_id, template.id, template.channel, request.is_active)
        .await?;

    info!(
        user_id = scope.user_id,
        template_id = template.id,
        channel = template.channel.as_str(),
        is_active = request.is_active,
        "Template activation changed"
    );

    Ok(Json(TemplateActivation {
        template,
        is_active: request.is_active,
    }))
}
