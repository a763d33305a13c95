//! Payment settings and the post-checkout redirect.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use domain::models::payment_gateway::enabled_gateways;
use domain::models::{ResolvedScope, SettingsMap, UpdateSettingsRequest};
use shared::url_safety::{is_own_app_url, is_safe_redirect_url, payment_redirect_domains};

use super::{require_manager, resolve_scope, ScopeQuery};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthenticatedTenant, Tenant};

/// Query flag appended to the home URL when a redirect is refused.
pub const UNSAFE_REDIRECT_FLAG: &str = "unsafe_redirect";

#[derive(Debug, Serialize)]
pub struct GatewaySummary {
    pub key: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GatewaysResponse {
    pub scope: ResolvedScope,
    pub gateways: Vec<GatewaySummary>,
}

/// GET /api/v1/payment-settings/gateways
///
/// Lists gateways that are switched on and have every required key. Secrets
/// are never echoed back.
pub async fn list_gateways(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<GatewaysResponse>, ApiError> {
    let scope = resolve_scope(&state.resolver, &ctx, query.scope()).await?;
    let settings = state.resolver.payment_settings(&ctx, query.scope()).await?;

    let gateways = summaries(&settings);

    Ok(Json(GatewaysResponse { scope, gateways }))
}

/// PUT /api/v1/payment-settings
pub async fn update_payment_settings(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<GatewaysResponse>, ApiError> {
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
        .set_payment_many(&ctx, &entries, query.scope(), request.ignore_workspace)
        .await?;
    if !written {
        return Err(ApiError::ServiceUnavailable(
            "Installation in progress".to_string(),
        ));
    }

    info!(
        user_id = scope.user_id,
        workspace_id = ?scope.workspace_id,
        count = request.settings.len(),
        "Payment settings updated"
    );

    let settings = state.resolver.payment_settings(&ctx, query.scope()).await?;
    let gateways = summaries(&settings);

    Ok(Json(GatewaysResponse { scope, gateways }))
}

fn summaries(settings: &SettingsMap) -> Vec<GatewaySummary> {
    enabled_gateways(settings)
        .into_iter()
        .map(|g| GatewaySummary {
            key: g.key,
            name: g.name,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    #[serde(default)]
    pub url: String,
}

/// GET /api/v1/payments/redirect?url=
///
/// Follows `url` only when it points at a payment provider or back at this
/// application; anything else lands on the home page with an error flag.
pub async fn payment_redirect(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Query(query): Query<RedirectQuery>,
) -> Redirect {
    let target = query.url.trim();
    let app_host = state.config.app_host();

    if is_safe_redirect_url(target, payment_redirect_domains())
        || (is_safe_redirect_url(target, &[]) && is_own_app_url(target, &app_host))
    {
        // The serialized form has control characters stripped or escaped, so
        // it is always a valid Location header.
        if let Ok(parsed) = url::Url::parse(target) {
            return Redirect::to(parsed.as_str());
        }
    }

    warn!(
        target_url = %target,
        user_id = ?ctx.principal.as_ref().map(|p| p.id),
        "Payment redirect blocked"
    );
    Redirect::to(&home_with_error(&state.config.server.app_base_url))
}

fn home_with_error(app_base_url: &str) -> String {
    match url::Url::parse(app_base_url) {
        Ok(mut home) => {
            home.set_path("/");
            home.set_query(Some(&format!("error={}", UNSAFE_REDIRECT_FLAG)));
            home.set_fragment(None);
            home.to_string()
        }
        Err(_) => format!("/?error={}", UNSAFE_REDIRECT_FLAG),
    }
}
