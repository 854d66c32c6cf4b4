//! Draft HTTP handlers.
//!
//! - GET /api/v1/drafts/{kind}/{key} - Load a saved draft
//! - PUT /api/v1/drafts/{kind}/{key} - Save (create or update) a draft
//! - DELETE /api/v1/drafts/{kind}/{key} - Discard a draft
//!
//! `kind` is `visitor`, `exhibitor` or `conference`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    models::draft::{FormDraft, FormKind, SaveDraftRequest},
    services::draft_service,
};

pub async fn get_draft(
    State(pool): State<DbPool>,
    Path((kind, key)): Path<(FormKind, String)>,
) -> Result<Json<FormDraft>, AppError> {
    Ok(Json(draft_service::load_draft(&pool, kind, &key).await?))
}

/// Save a draft.
///
/// # Request Body
///
/// ```json
/// { "data": { "first_name": "Maria", "step": 2 }, "expected_version": 3 }
/// ```
///
/// Returns 409 when `expected_version` no longer matches.
pub async fn save_draft(
    State(pool): State<DbPool>,
    Path((kind, key)): Path<(FormKind, String)>,
    AppJson(request): AppJson<SaveDraftRequest>,
) -> Result<Json<FormDraft>, AppError> {
    Ok(Json(draft_service::save_draft(&pool, kind, &key, request).await?))
}

pub async fn delete_draft(
    State(pool): State<DbPool>,
    Path((kind, key)): Path<(FormKind, String)>,
) -> Result<StatusCode, AppError> {
    draft_service::discard_draft(&pool, kind, &key).await?;

    Ok(StatusCode::NO_CONTENT)
}
