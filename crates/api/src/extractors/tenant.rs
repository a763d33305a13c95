//! Tenant context extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use domain::models::TenantContext;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::tenant::anonymous_context;

/// The request's [`TenantContext`].
///
/// Uses the context inserted by the tenant middleware; routes mounted
/// without it get an anonymous context.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantContext);

#[async_trait]
impl FromRequestParts<AppState> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(Tenant(ctx.clone()));
        }

        Ok(Tenant(anonymous_context(state, parts.uri.path())))
    }
}

/// Like [`Tenant`] but rejects requests without an authenticated principal.
#[derive(Debug, Clone)]
pub struct AuthenticatedTenant(pub TenantContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedTenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<TenantContext>() {
            Some(ctx) if ctx.principal.is_some() => Ok(AuthenticatedTenant(ctx.clone())),
            _ => Err(ApiError::Unauthorized(
                "Missing or invalid Authorization header".to_string(),
            )),
        }
    }
}
