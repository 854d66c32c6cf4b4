//! Back-office service behind the admin data tables.
//!
//! Listings share the `ListQuery` paging/sorting/search contract. Each
//! registrant row shows the most recent personal details the person
//! submitted.

use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        conference::{
            ConferencePayment, PaymentStatus, RegistrantDetail, RegistrantRow,
            SelectedEventLine, UpdateRegistrantRequest,
        },
        exhibitor::{Exhibitor, ExhibitorRow},
        listing::{ListQuery, Page, SortColumn},
        user::AccountType,
        visitor::VisitorRow,
    },
    services::code_service,
};

const REGISTRANT_SORT: &[SortColumn] = &[
    ("created_at", "c.created_at"),
    ("email", "c.email"),
    ("last_name", "d.last_name"),
    ("company_name", "d.company_name"),
    ("total_cents", "c.total_cents"),
    ("payment_status", "c.payment_status"),
];

const VISITOR_SORT: &[SortColumn] = &[
    ("created_at", "a.created_at"),
    ("email", "u.email"),
    ("last_name", "d.last_name"),
    ("company_name", "d.company_name"),
];

const EXHIBITOR_SORT: &[SortColumn] = &[
    ("created_at", "x.created_at"),
    ("email", "x.email"),
    ("company_name", "x.company_name"),
];

/// Registrants joined with their latest personal details.
const REGISTRANT_FROM: &str = r#"
    FROM conferences c
    JOIN LATERAL (
        SELECT * FROM user_details ud
        WHERE ud.user_id = c.user_id
        ORDER BY ud.created_at DESC
        LIMIT 1
    ) d ON true
"#;

const REGISTRANT_COLUMNS: &str = r#"
    c.id, c.email, d.first_name, d.last_name, d.mobile_number, d.company_name,
    c.membership, c.tml_code, c.payment_mode, c.total_cents, c.payment_status,
    c.created_at
"#;

pub async fn list_registrants(
    pool: &DbPool,
    query: &ListQuery,
) -> Result<Page<RegistrantRow>, AppError> {
    let search = query.search_pattern();
    let status = query.status_filter();
    let filter = r#"
        WHERE ($1::text IS NULL
               OR c.email ILIKE $1
               OR d.first_name ILIKE $1
               OR d.last_name ILIKE $1
               OR d.company_name ILIKE $1
               OR c.tml_code ILIKE $1)
          AND ($2::text IS NULL OR c.payment_status = $2)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {REGISTRANT_FROM} {filter}"))
        .bind(&search)
        .bind(&status)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, RegistrantRow>(&format!(
        "SELECT {REGISTRANT_COLUMNS} {REGISTRANT_FROM} {filter} ORDER BY {} LIMIT $3 OFFSET $4",
        query.order_by(REGISTRANT_SORT)
    ))
    .bind(&search)
    .bind(&status)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(items, total, query))
}

/// Registrant with selected events and payment history.
pub async fn get_registrant(pool: &DbPool, conference_id: Uuid) -> Result<RegistrantDetail, AppError> {
    let registrant = sqlx::query_as::<_, RegistrantRow>(&format!(
        "SELECT {REGISTRANT_COLUMNS} {REGISTRANT_FROM} WHERE c.id = $1"
    ))
    .bind(conference_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Registrant"))?;

    let events = sqlx::query_as::<_, SelectedEventLine>(
        r#"
        SELECT s.event_id, e.name, s.price_cents
        FROM summary_of_payments s
        JOIN events e ON e.id = s.event_id
        WHERE s.conference_id = $1
        ORDER BY e.starts_at ASC NULLS LAST, e.name ASC
        "#,
    )
    .bind(conference_id)
    .fetch_all(pool)
    .await?;

    let payments = sqlx::query_as::<_, ConferencePayment>(
        "SELECT * FROM conference_payments WHERE conference_id = $1 ORDER BY created_at DESC",
    )
    .bind(conference_id)
    .fetch_all(pool)
    .await?;

    Ok(RegistrantDetail {
        registrant,
        events,
        payments,
    })
}

/// Correct a registrant's personal details.
pub async fn update_registrant(
    pool: &DbPool,
    conference_id: Uuid,
    request: UpdateRegistrantRequest,
) -> Result<RegistrantDetail, AppError> {
    request.validate()?;

    let mut tx = pool.begin().await?;

    let user_id: Uuid = sqlx::query_scalar("SELECT user_id FROM conferences WHERE id = $1 FOR UPDATE")
        .bind(conference_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Registrant"))?;

    sqlx::query(
        r#"
        UPDATE user_details
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            mobile_number = COALESCE($4, mobile_number),
            company_name = COALESCE($5, company_name),
            position = COALESCE($6, position)
        WHERE id = (
            SELECT id FROM user_details
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
        )
        "#,
    )
    .bind(user_id)
    .bind(request.first_name.as_deref().map(str::trim))
    .bind(request.last_name.as_deref().map(str::trim))
    .bind(request.mobile_number.as_deref().map(str::trim))
    .bind(request.company_name)
    .bind(request.position)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE conferences SET updated_at = NOW() WHERE id = $1")
        .bind(conference_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    get_registrant(pool, conference_id).await
}

/// Delete a conference registration and free its membership code.
pub async fn delete_registrant(pool: &DbPool, conference_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let tml_code: Option<Option<String>> =
        sqlx::query_scalar("DELETE FROM conferences WHERE id = $1 RETURNING tml_code")
            .bind(conference_id)
            .fetch_optional(&mut *tx)
            .await?;

    let Some(tml_code) = tml_code else {
        tx.rollback().await?;
        return Err(AppError::NotFound("Registrant"));
    };

    if let Some(code) = tml_code {
        code_service::release_code(&mut tx, &code).await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Settle a walk-in registration paid at the venue.
///
/// # Errors
///
/// `InvalidRequest` when the registration is not awaiting payment.
pub async fn mark_paid(pool: &DbPool, conference_id: Uuid) -> Result<RegistrantDetail, AppError> {
    let mut tx = pool.begin().await?;

    let status: String =
        sqlx::query_scalar("SELECT payment_status FROM conferences WHERE id = $1 FOR UPDATE")
            .bind(conference_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Registrant"))?;

    if status != PaymentStatus::Pending.as_str() {
        tx.rollback().await?;
        return Err(AppError::InvalidRequest(format!(
            "Registration is {} and cannot be marked paid",
            status
        )));
    }

    sqlx::query(
        "UPDATE conferences SET payment_status = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(conference_id)
    .bind(PaymentStatus::Paid.as_str())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE conference_payments
        SET status = $2, paid_at = NOW()
        WHERE conference_id = $1 AND status = $3
        "#,
    )
    .bind(conference_id)
    .bind(PaymentStatus::Paid.as_str())
    .bind(PaymentStatus::Pending.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_registrant(pool, conference_id).await
}

pub async fn list_visitors(pool: &DbPool, query: &ListQuery) -> Result<Page<VisitorRow>, AppError> {
    let search = query.search_pattern();
    let from = r#"
        FROM user_accounts a
        JOIN users u ON u.id = a.user_id
        JOIN LATERAL (
            SELECT * FROM user_details ud
            WHERE ud.user_id = a.user_id
            ORDER BY ud.created_at DESC
            LIMIT 1
        ) d ON true
        WHERE a.account_type = $1
          AND ($2::text IS NULL
               OR u.email ILIKE $2
               OR d.first_name ILIKE $2
               OR d.last_name ILIKE $2
               OR d.company_name ILIKE $2)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {from}"))
        .bind(AccountType::Visitor.as_str())
        .bind(&search)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, VisitorRow>(&format!(
        r#"
        SELECT a.id, u.email, d.first_name, d.last_name, d.mobile_number,
               d.company_name, a.attributes, a.created_at
        {from}
        ORDER BY {}
        LIMIT $3 OFFSET $4
        "#,
        query.order_by(VISITOR_SORT)
    ))
    .bind(AccountType::Visitor.as_str())
    .bind(&search)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(items, total, query))
}

pub async fn list_exhibitors(
    pool: &DbPool,
    query: &ListQuery,
) -> Result<Page<ExhibitorRow>, AppError> {
    let search = query.search_pattern();
    let from = r#"
        FROM exhibitors x
        JOIN LATERAL (
            SELECT * FROM user_details ud
            WHERE ud.user_id = x.user_id
            ORDER BY ud.created_at DESC
            LIMIT 1
        ) d ON true
        WHERE ($1::text IS NULL
               OR x.email ILIKE $1
               OR x.company_name ILIKE $1
               OR d.last_name ILIKE $1)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {from}"))
        .bind(&search)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, ExhibitorRow>(&format!(
        r#"
        SELECT x.id, x.email, x.company_name, d.first_name, d.last_name,
               d.mobile_number, x.booth_size, x.product_categories, x.created_at
        {from}
        ORDER BY {}
        LIMIT $2 OFFSET $3
        "#,
        query.order_by(EXHIBITOR_SORT)
    ))
    .bind(&search)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(items, total, query))
}

/// Remove an exhibitor registration. The contact's user record stays.
pub async fn delete_exhibitor(pool: &DbPool, exhibitor_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let exhibitor = sqlx::query_as::<_, Exhibitor>("DELETE FROM exhibitors WHERE id = $1 RETURNING *")
        .bind(exhibitor_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Exhibitor"))?;

    sqlx::query("DELETE FROM user_accounts WHERE user_id = $1 AND account_type = $2")
        .bind(exhibitor.user_id)
        .bind(AccountType::Exhibitor.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}
