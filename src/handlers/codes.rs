//! Membership code HTTP handlers.

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
        code::{CodeDistribution, CreateCodesRequest, ValidateCodeRequest, ValidateCodeResponse},
        listing::{ListQuery, Page},
    },
    services::code_service,
};

/// Check a membership code before the conference form is submitted.
///
/// # Request Body
///
/// ```json
/// { "code": "TML-0001", "email": "maria@example.com" }
/// ```
///
/// # Response
///
/// - **200**: `{ "valid": true, "organization": "..." }`
/// - **400**: code unknown or claimed by another email
pub async fn validate_code(
    State(pool): State<DbPool>,
    AppJson(request): AppJson<ValidateCodeRequest>,
) -> Result<Json<ValidateCodeResponse>, AppError> {
    Ok(Json(code_service::validate_code(&pool, request).await?))
}

pub async fn list_codes(
    State(pool): State<DbPool>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<CodeDistribution>>, AppError> {
    Ok(Json(code_service::list_codes(&pool, &query).await?))
}

/// Issue a batch of codes; returns only the codes that were new.
pub async fn create_codes(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreateCodesRequest>,
) -> Result<(StatusCode, Json<Vec<CodeDistribution>>), AppError> {
    let created = code_service::create_codes(&pool, request).await?;
    tracing::info!(
        created = created.len(),
        api_key_id = %auth.api_key_id,
        by = %auth.label,
        "Codes issued"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_code(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(code_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    code_service::delete_code(&pool, code_id).await?;
    tracing::info!(%code_id, api_key_id = %auth.api_key_id, by = %auth.label, "Code deleted");

    Ok(StatusCode::NO_CONTENT)
}
