//! Tenant context middleware.
//!
//! Turns the bearer token into a [`TenantContext`] stored in request
//! extensions. The context is marked bootstrapping while the installer has
//! not finished or when the request is for an installer/updater path, so
//! the settings resolver never touches storage during setup.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use domain::models::{TenantContext, User};
use shared::jwt::extract_user_id;

use crate::app::AppState;

const BOOTSTRAP_PATH_PREFIXES: &[&str] = &["/install", "/update"];

/// Path of an installer or updater request.
pub fn is_bootstrap_path(path: &str) -> bool {
    BOOTSTRAP_PATH_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Context for a request with no principal.
pub fn anonymous_context(state: &AppState, path: &str) -> TenantContext {
    if state.config.installation_pending() || is_bootstrap_path(path) {
        TenantContext::bootstrapping(state.config.tenancy.mode)
    } else {
        TenantContext::anonymous(state.config.tenancy.mode)
    }
}

fn authenticated_context(state: &AppState, path: &str, user: User) -> TenantContext {
    let mut ctx = TenantContext::authenticated(user, state.config.tenancy.mode);
    ctx.bootstrapping = state.config.installation_pending() || is_bootstrap_path(path);
    ctx
}

async fn authenticate(state: &AppState, token: &str) -> Result<User, Response> {
    let claims = state.jwt.validate_token(token).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        unauthorized_response("Invalid or expired token")
    })?;

    let user_id = extract_user_id(&claims)
        .map_err(|_| unauthorized_response("Invalid user ID in token"))?;

    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            tracing::debug!(user_id, "Token subject does not exist");
            Err(unauthorized_response("Invalid or expired token"))
        }
        Err(e) => {
            tracing::error!(user_id, error = %e, "Failed to load principal");
            Err(internal_error_response("Authentication service unavailable"))
        }
    }
}

/// Requires a valid bearer token whose subject exists.
pub async fn require_tenant(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&req) else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    let user = match authenticate(&state, token).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let ctx = authenticated_context(&state, req.uri().path(), user);
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Attaches a context when a valid token is present, otherwise an anonymous one.
pub async fn optional_tenant(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let ctx = match bearer_token(&req) {
        Some(token) => match authenticate(&state, token).await {
            Ok(user) => authenticated_context(&state, &path, user),
            Err(_) => anonymous_context(&state, &path),
        },
        None => anonymous_context(&state, &path),
    };

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Rejects principals that are not super admins. Runs after [`require_tenant`].
pub async fn require_super_admin(req: Request<Body>, next: Next) -> Response {
    let is_admin = req
        .extensions()
        .get::<TenantContext>()
        .and_then(|ctx| ctx.principal.as_ref())
        .is_some_and(User::is_super_admin);

    if !is_admin {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "forbidden",
                "message": "Super admin access required"
            })),
        )
            .into_response();
    }

    next.run(req).await
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

fn internal_error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": message
        })),
    )
        .into_response()
}
