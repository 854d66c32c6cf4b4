//! Membership code service.
//!
//! Codes are issued in batches per member organization. A code becomes bound
//! to an email the first time a conference registration uses it; after that
//! only the same email may present it again.

use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        code::{CodeDistribution, CreateCodesRequest, ValidateCodeRequest, ValidateCodeResponse},
        listing::{ListQuery, Page, SortColumn},
        user::normalize_email,
    },
};

const SORT_COLUMNS: &[SortColumn] = &[
    ("created_at", "created_at"),
    ("code", "code"),
    ("organization", "organization"),
    ("bound_at", "bound_at"),
];

/// Codes are matched case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub async fn find_code(pool: &DbPool, code: &str) -> Result<Option<CodeDistribution>, AppError> {
    let code = sqlx::query_as::<_, CodeDistribution>(
        "SELECT * FROM code_distributions WHERE code = $1",
    )
    .bind(normalize_code(code))
    .fetch_optional(pool)
    .await?;

    Ok(code)
}

/// Check that `code` exists and is not bound to a different email.
///
/// # Errors
///
/// `InvalidMembershipCode` when the code is unknown or already claimed.
pub async fn ensure_code_available(
    pool: &DbPool,
    code: &str,
    email: &str,
) -> Result<CodeDistribution, AppError> {
    let record = find_code(pool, code).await?.ok_or_else(|| {
        AppError::InvalidMembershipCode("Membership code not found".to_string())
    })?;

    if !record.is_available_to(email) {
        return Err(AppError::InvalidMembershipCode(
            "Membership code is already in use".to_string(),
        ));
    }

    Ok(record)
}

/// Bind a code to a registrant inside the registration transaction.
///
/// The conditional update makes the claim atomic: when two submissions race
/// for one code, only the first email wins.
pub async fn bind_code(
    conn: &mut PgConnection,
    code: &str,
    email: &str,
    user_id: Uuid,
) -> Result<(), AppError> {
    let bound = sqlx::query(
        r#"
        UPDATE code_distributions
        SET bound_email = $1,
            bound_user_id = $2,
            bound_at = COALESCE(bound_at, NOW())
        WHERE code = $3
          AND (bound_email IS NULL OR bound_email = $1)
        "#,
    )
    .bind(email)
    .bind(user_id)
    .bind(normalize_code(code))
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if bound == 0 {
        return Err(AppError::InvalidMembershipCode(
            "Membership code is already in use".to_string(),
        ));
    }

    Ok(())
}

/// Release a code so it can be claimed again (registration deleted).
pub async fn release_code(conn: &mut PgConnection, code: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE code_distributions
        SET bound_email = NULL, bound_user_id = NULL, bound_at = NULL
        WHERE code = $1
        "#,
    )
    .bind(normalize_code(code))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Public pre-check used by the conference form before submission.
pub async fn validate_code(
    pool: &DbPool,
    request: ValidateCodeRequest,
) -> Result<ValidateCodeResponse, AppError> {
    request.validate()?;

    let record = ensure_code_available(pool, &request.code, &normalize_email(&request.email)).await?;

    Ok(ValidateCodeResponse {
        valid: true,
        organization: record.organization,
    })
}

/// Issue a batch of codes. Codes that already exist are skipped.
///
/// # Returns
///
/// Only the newly created codes.
pub async fn create_codes(
    pool: &DbPool,
    request: CreateCodesRequest,
) -> Result<Vec<CodeDistribution>, AppError> {
    request.validate()?;

    let mut codes: Vec<String> = request
        .codes
        .iter()
        .map(|code| normalize_code(code))
        .filter(|code| !code.is_empty())
        .collect();
    codes.sort();
    codes.dedup();

    if codes.is_empty() {
        return Err(AppError::InvalidRequest("No codes supplied".to_string()));
    }

    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(codes.len());

    for code in &codes {
        let inserted = sqlx::query_as::<_, CodeDistribution>(
            r#"
            INSERT INTO code_distributions (code, organization)
            VALUES ($1, $2)
            ON CONFLICT (code) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(request.organization.trim())
        .fetch_optional(&mut *tx)
        .await?;

        created.extend(inserted);
    }

    tx.commit().await?;

    tracing::info!(
        organization = %request.organization,
        requested = codes.len(),
        created = created.len(),
        "Membership codes issued"
    );

    Ok(created)
}

pub async fn list_codes(
    pool: &DbPool,
    query: &ListQuery,
) -> Result<Page<CodeDistribution>, AppError> {
    let search = query.search_pattern();
    let filter = r#"
        WHERE ($1::text IS NULL
               OR code ILIKE $1
               OR organization ILIKE $1
               OR bound_email ILIKE $1)
    "#;

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM code_distributions {filter}"))
            .bind(&search)
            .fetch_one(pool)
            .await?;

    let items = sqlx::query_as::<_, CodeDistribution>(&format!(
        "SELECT * FROM code_distributions {filter} ORDER BY {} LIMIT $2 OFFSET $3",
        query.order_by(SORT_COLUMNS)
    ))
    .bind(&search)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(items, total, query))
}

/// Delete an unclaimed code.
///
/// # Errors
///
/// - `NotFound` when the id does not exist
/// - `InvalidRequest` when the code is already bound to a registrant
pub async fn delete_code(pool: &DbPool, code_id: Uuid) -> Result<(), AppError> {
    let record = sqlx::query_as::<_, CodeDistribution>(
        "SELECT * FROM code_distributions WHERE id = $1",
    )
    .bind(code_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Membership code"))?;

    if record.bound_email.is_some() {
        return Err(AppError::InvalidRequest(
            "Membership code is already claimed".to_string(),
        ));
    }

    sqlx::query("DELETE FROM code_distributions WHERE id = $1")
        .bind(code_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_trimmed_and_upper_cased() {
        assert_eq!(normalize_code("  tml-0042 "), "TML-0042");
    }
}
