//! Draft persistence for the multi-step registration forms.
//!
//! Each save bumps the draft's `version`. A client that sends the version it
//! last loaded gets a conflict instead of silently overwriting a newer save
//! from another tab.

use crate::{
    db::DbPool,
    error::AppError,
    models::draft::{FormDraft, FormKind, SaveDraftRequest},
};

const MAX_KEY_LEN: usize = 128;

fn check_key(key: &str) -> Result<(), AppError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Draft key must be 1 to {} characters",
            MAX_KEY_LEN
        )));
    }

    Ok(())
}

pub async fn load_draft(pool: &DbPool, kind: FormKind, key: &str) -> Result<FormDraft, AppError> {
    check_key(key)?;

    let draft = sqlx::query_as::<_, FormDraft>(
        "SELECT * FROM form_drafts WHERE form_kind = $1 AND draft_key = $2",
    )
    .bind(kind.as_str())
    .bind(key)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Draft"))?;

    Ok(draft)
}

/// Create or update a draft.
///
/// # Errors
///
/// - `InvalidRequest`: bad key or non-object data
/// - `Conflict`: `expected_version` is stale
/// - `NotFound`: `expected_version` given for a draft that does not exist
pub async fn save_draft(
    pool: &DbPool,
    kind: FormKind,
    key: &str,
    request: SaveDraftRequest,
) -> Result<FormDraft, AppError> {
    check_key(key)?;

    if !request.data.is_object() {
        return Err(AppError::InvalidRequest(
            "Draft data must be a JSON object".to_string(),
        ));
    }

    let Some(expected_version) = request.expected_version else {
        let draft = sqlx::query_as::<_, FormDraft>(
            r#"
            INSERT INTO form_drafts (form_kind, draft_key, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (form_kind, draft_key) DO UPDATE
            SET data = EXCLUDED.data,
                version = form_drafts.version + 1,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(kind.as_str())
        .bind(key)
        .bind(&request.data)
        .fetch_one(pool)
        .await?;

        return Ok(draft);
    };

    let updated = sqlx::query_as::<_, FormDraft>(
        r#"
        UPDATE form_drafts
        SET data = $3, version = version + 1, updated_at = NOW()
        WHERE form_kind = $1 AND draft_key = $2 AND version = $4
        RETURNING *
        "#,
    )
    .bind(kind.as_str())
    .bind(key)
    .bind(&request.data)
    .bind(expected_version)
    .fetch_optional(pool)
    .await?;

    if let Some(draft) = updated {
        return Ok(draft);
    }

    // Distinguish a stale version from a missing draft
    let current = load_draft(pool, kind, key).await?;
    Err(AppError::Conflict(format!(
        "Draft was saved elsewhere (version {}); reload before saving",
        current.version
    )))
}

/// Delete drafts nobody has saved for `ttl_days` days.
pub async fn purge_stale_drafts(pool: &DbPool, ttl_days: i32) -> Result<u64, AppError> {
    let purged = sqlx::query(
        "DELETE FROM form_drafts WHERE updated_at < NOW() - make_interval(days => $1)",
    )
    .bind(ttl_days)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(purged)
}

pub async fn discard_draft(pool: &DbPool, kind: FormKind, key: &str) -> Result<(), AppError> {
    check_key(key)?;

    let deleted = sqlx::query("DELETE FROM form_drafts WHERE form_kind = $1 AND draft_key = $2")
        .bind(kind.as_str())
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Draft"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn rejects_empty_and_oversized_keys() {
        assert_matches!(check_key(""), Err(AppError::InvalidRequest(_)));
        assert_matches!(check_key(&"k".repeat(129)), Err(AppError::InvalidRequest(_)));
        assert!(check_key("browser-7f3a").is_ok());
    }
}
