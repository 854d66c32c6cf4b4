//! Event catalog HTTP handlers.
//!
//! - GET /api/v1/events - Active catalog for the registration form
//! - GET|POST /api/v1/admin/events - Admin listing and creation
//! - PUT|DELETE /api/v1/admin/events/{id} - Admin edit and removal

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::{
        event::{CreateEventRequest, Event, UpdateEventRequest},
        listing::{ListQuery, Page},
    },
    services::event_service::{self, EventRemoval},
};

pub async fn list_active_events(State(pool): State<DbPool>) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(event_service::active_events(&pool).await?))
}

pub async fn list_events(
    State(pool): State<DbPool>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Event>>, AppError> {
    Ok(Json(event_service::list_events(&pool, &query).await?))
}

pub async fn create_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = event_service::create_event(&pool, request).await?;
    tracing::info!(
        event_id = %event.id,
        api_key_id = %auth.api_key_id,
        by = %auth.label,
        "Event added to catalog"
    );

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(event_id): Path<Uuid>,
    AppJson(request): AppJson<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let event = event_service::update_event(&pool, event_id, request).await?;
    tracing::info!(%event_id, api_key_id = %auth.api_key_id, by = %auth.label, "Event updated");

    Ok(Json(event))
}

#[derive(Debug, Serialize)]
pub struct EventRemovalResponse {
    pub id: Uuid,
    pub result: EventRemoval,
}

/// Delete an event, or deactivate it when registrations reference it.
pub async fn delete_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventRemovalResponse>, AppError> {
    let result = event_service::delete_event(&pool, event_id).await?;
    tracing::info!(
        %event_id,
        ?result,
        api_key_id = %auth.api_key_id,
        by = %auth.label,
        "Event removed"
    );

    Ok(Json(EventRemovalResponse {
        id: event_id,
        result,
    }))
}
