//! Event dispatch endpoints.
//!
//! Every send is attempted once and reported per channel. A channel that
//! fails does not fail the request; the caller reads the outcomes.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use validator::Validate;

use domain::models::{
    CalendarDispatchRequest, ChannelOutcome, DispatchEvent, DispatchResult, SendEmailRequest,
};

use super::ScopeQuery;
use crate::app::AppState;
use crate::error::{safe_error_message, ApiError};
use crate::extractors::AuthenticatedTenant;
use crate::middleware::record_dispatch_outcome;
use crate::services::email;

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub outcomes: Vec<ChannelOutcome>,
}

/// POST /api/v1/dispatch
pub async fn dispatch_event(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Query(query): Query<ScopeQuery>,
    Json(event): Json<DispatchEvent>,
) -> Result<Json<DispatchResponse>, ApiError> {
    event.validate()?;

    let outcomes = state
        .dispatcher
        .dispatch(&ctx, query.scope(), &event)
        .await?;

    Ok(Json(DispatchResponse { outcomes }))
}

/// POST /api/v1/dispatch/calendar
///
/// Notifies about a task or meeting through the same channels as
/// [`dispatch_event`].
pub async fn dispatch_calendar(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Query(query): Query<ScopeQuery>,
    Json(request): Json<CalendarDispatchRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    request.validate()?;

    let event = request
        .source
        .dispatch_event(&request.template, request.url.clone());
    let outcomes = state
        .dispatcher
        .dispatch(&ctx, query.scope(), &event)
        .await?;

    Ok(Json(DispatchResponse { outcomes }))
}

/// POST /api/v1/dispatch/email
///
/// Relay misconfiguration is an error response; a relay that refuses the
/// message is a `failed` outcome. Relay error text is only shown in debug.
pub async fn send_email(
    State(state): State<AppState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Query(query): Query<ScopeQuery>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<ChannelOutcome>, ApiError> {
    request.validate()?;
    let debug = state.config.server.debug;

    let result = state
        .email
        .send_templated(&ctx, query.scope(), &request)
        .await
        .map_err(|e| ApiError::from_email(e, debug))?;
    record_dispatch_outcome(email::CHANNEL, &result);

    let result = match result {
        DispatchResult::Failed { status, error } => DispatchResult::Failed {
            status,
            error: safe_error_message(&error, debug),
        },
        other => other,
    };

    Ok(Json(ChannelOutcome {
        channel: email::CHANNEL,
        target: Some(request.to.trim().to_string()),
        result,
    }))
}
