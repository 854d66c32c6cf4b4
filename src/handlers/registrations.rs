//! Registration HTTP handlers.
//!
//! This module implements the public form endpoints:
//! - POST /api/v1/registrations/quote - Price a selection of events
//! - POST /api/v1/registrations/conference - Submit a conference registration
//! - POST /api/v1/registrations/visitor - Submit a visitor registration
//! - POST /api/v1/registrations/exhibitor - Submit an exhibitor registration

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    models::{
        conference::{ConferenceRegistrationRequest, Quote, QuoteRequest, RegistrationOutcome},
        exhibitor::ExhibitorRegistrationRequest,
        user::RegistrationReceipt,
        visitor::VisitorRegistrationRequest,
    },
    services::{event_service, pricing, registration_service},
    state::AppState,
};

/// Price a selection without registering.
///
/// # Request Body
///
/// ```json
/// {
///   "selected_event_ids": ["550e8400-...", "660e8400-..."],
///   "membership": "NO"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "subtotal_cents": 750000,
///   "discount_cents": 150000,
///   "total_cents": 600000,
///   "requires_payment": true
/// }
/// ```
pub async fn quote(
    State(state): State<AppState>,
    AppJson(request): AppJson<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let catalog = event_service::active_events(&state.pool).await?;
    let selected = pricing::resolve_selection(&request.selected_event_ids, &catalog)?;

    Ok(Json(pricing::quote(
        &selected,
        &catalog,
        request.membership,
        state.config.conference_discount_cents,
    )))
}

/// Submit a conference registration.
///
/// # Response (201)
///
/// One of:
///
/// ```json
/// { "status": "registered", "conference_id": "...", "quote": { ... } }
/// { "status": "pending_payment", "conference_id": "...", "quote": { ... } }
/// { "status": "checkout_required", "reference": "...", "checkout_url": "https://...", "quote": { ... } }
/// ```
///
/// For `checkout_required` the browser redirects to `checkout_url`; the
/// registration is recorded once the gateway confirms payment.
pub async fn register_conference(
    State(state): State<AppState>,
    AppJson(request): AppJson<ConferenceRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationOutcome>), AppError> {
    let outcome = registration_service::register_conference(
        &state.pool,
        state.gateway.as_ref(),
        &state.config,
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn register_visitor(
    State(pool): State<DbPool>,
    AppJson(request): AppJson<VisitorRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationReceipt>), AppError> {
    let user_id = registration_service::register_visitor(&pool, request).await?;

    Ok((StatusCode::CREATED, Json(RegistrationReceipt::registered(user_id))))
}

pub async fn register_exhibitor(
    State(pool): State<DbPool>,
    AppJson(request): AppJson<ExhibitorRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationReceipt>), AppError> {
    let exhibitor_id = registration_service::register_exhibitor(&pool, request).await?;

    Ok((StatusCode::CREATED, Json(RegistrationReceipt::registered(exhibitor_id))))
}
