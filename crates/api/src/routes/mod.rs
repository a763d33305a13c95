//! HTTP route handlers.

pub mod admin;
pub mod dispatch;
pub mod health;
pub mod notification_templates;
pub mod payments;
pub mod settings;
pub mod webhooks;

use serde::Deserialize;

use domain::models::{ResolvedScope, ScopeRequest, TenantContext, UserRole};
use domain::services::SettingsResolver;

use crate::error::ApiError;

/// Optional `?workspace_id=` accepted by tenant routes.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    pub workspace_id: Option<i64>,
}

impl ScopeQuery {
    pub fn scope(&self) -> ScopeRequest {
        ScopeRequest {
            user_id: None,
            workspace_id: self.workspace_id,
        }
    }
}

/// Resolves the caller's storage scope, or 503 while bootstrapping.
pub(crate) async fn resolve_scope(
    resolver: &SettingsResolver,
    ctx: &TenantContext,
    scope: ScopeRequest,
) -> Result<ResolvedScope, ApiError> {
    resolver.resolve_scope(ctx, scope).await?.ok_or_else(|| {
        ApiError::ServiceUnavailable("Installation in progress".to_string())
    })
}

/// Members read their company's configuration but cannot change it.
pub(crate) fn require_manager(ctx: &TenantContext) -> Result<(), ApiError> {
    match ctx.principal.as_ref().map(|p| p.role) {
        Some(UserRole::SuperAdmin) | Some(UserRole::Company) => Ok(()),
        _ => Err(ApiError::Forbidden(
            "Only company owners can change integrations".to_string(),
        )),
    }
}
