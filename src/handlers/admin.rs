//! Admin back-office HTTP handlers for registrants, visitors and exhibitors.
//!
//! All routes here sit behind the API key middleware.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::{
        conference::{RegistrantDetail, RegistrantRow, UpdateRegistrantRequest},
        exhibitor::ExhibitorRow,
        listing::{ListQuery, Page},
        visitor::VisitorRow,
    },
    services::admin_service,
};

/// List conference registrants.
///
/// # Query Parameters
///
/// - `page`, `per_page`: paging (default 1 / 20, max 100 per page)
/// - `sort`: `created_at`, `email`, `last_name`, `company_name`, `total_cents`, `payment_status`
/// - `order`: `asc` or `desc`
/// - `search`: matches email, names, company and membership code
/// - `status`: `FREE`, `PENDING` or `PAID`
pub async fn list_registrants(
    State(pool): State<DbPool>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<RegistrantRow>>, AppError> {
    Ok(Json(admin_service::list_registrants(&pool, &query).await?))
}

pub async fn get_registrant(
    State(pool): State<DbPool>,
    Path(conference_id): Path<Uuid>,
) -> Result<Json<RegistrantDetail>, AppError> {
    Ok(Json(admin_service::get_registrant(&pool, conference_id).await?))
}

pub async fn update_registrant(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(conference_id): Path<Uuid>,
    AppJson(request): AppJson<UpdateRegistrantRequest>,
) -> Result<Json<RegistrantDetail>, AppError> {
    let detail = admin_service::update_registrant(&pool, conference_id, request).await?;
    tracing::info!(
        %conference_id,
        api_key_id = %auth.api_key_id,
        by = %auth.label,
        "Registrant updated"
    );

    Ok(Json(detail))
}

pub async fn delete_registrant(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(conference_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_registrant(&pool, conference_id).await?;
    tracing::info!(
        %conference_id,
        api_key_id = %auth.api_key_id,
        by = %auth.label,
        "Registrant deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Record a walk-in payment collected at the venue.
pub async fn mark_registrant_paid(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(conference_id): Path<Uuid>,
) -> Result<Json<RegistrantDetail>, AppError> {
    let detail = admin_service::mark_paid(&pool, conference_id).await?;
    tracing::info!(
        %conference_id,
        api_key_id = %auth.api_key_id,
        by = %auth.label,
        "Walk-in payment recorded"
    );

    Ok(Json(detail))
}

pub async fn list_visitors(
    State(pool): State<DbPool>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<VisitorRow>>, AppError> {
    Ok(Json(admin_service::list_visitors(&pool, &query).await?))
}

pub async fn list_exhibitors(
    State(pool): State<DbPool>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<ExhibitorRow>>, AppError> {
    Ok(Json(admin_service::list_exhibitors(&pool, &query).await?))
}

pub async fn delete_exhibitor(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(exhibitor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_exhibitor(&pool, exhibitor_id).await?;
    tracing::info!(
        %exhibitor_id,
        api_key_id = %auth.api_key_id,
        by = %auth.label,
        "Exhibitor deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
