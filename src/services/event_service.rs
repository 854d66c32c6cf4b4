//! Event catalog service.

use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        event::{CreateEventRequest, Event, UpdateEventRequest},
        listing::{ListQuery, Page, SortColumn},
    },
};

const SORT_COLUMNS: &[SortColumn] = &[
    ("created_at", "created_at"),
    ("name", "name"),
    ("price_cents", "price_cents"),
    ("starts_at", "starts_at"),
    ("status", "status"),
];

/// How an event left the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRemoval {
    Deleted,
    /// Kept because registrations reference it; hidden from the catalog
    Deactivated,
}

/// Events currently offered on the registration form.
pub async fn active_events(pool: &DbPool) -> Result<Vec<Event>, AppError> {
    let events = sqlx::query_as::<_, Event>(
        r#"
        SELECT * FROM events
        WHERE is_active = true
        ORDER BY starts_at ASC NULLS LAST, name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(events)
}

pub async fn list_events(pool: &DbPool, query: &ListQuery) -> Result<Page<Event>, AppError> {
    let search = query.search_pattern();
    let status = query.status_filter();
    let filter = r#"
        WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
          AND ($2::text IS NULL OR status = $2)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM events {filter}"))
        .bind(&search)
        .bind(&status)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, Event>(&format!(
        "SELECT * FROM events {filter} ORDER BY {} LIMIT $3 OFFSET $4",
        query.order_by(SORT_COLUMNS)
    ))
    .bind(&search)
    .bind(&status)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(items, total, query))
}

pub async fn create_event(pool: &DbPool, request: CreateEventRequest) -> Result<Event, AppError> {
    request.validate()?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (name, description, price_cents, status, is_active, starts_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(request.description)
    .bind(request.price_cents)
    .bind(request.status.as_str())
    .bind(request.is_active)
    .bind(request.starts_at)
    .fetch_one(pool)
    .await?;

    tracing::info!(event_id = %event.id, name = %event.name, "Event created");

    Ok(event)
}

pub async fn update_event(
    pool: &DbPool,
    event_id: Uuid,
    request: UpdateEventRequest,
) -> Result<Event, AppError> {
    request.validate()?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            price_cents = COALESCE($4, price_cents),
            status = COALESCE($5, status),
            is_active = COALESCE($6, is_active),
            starts_at = COALESCE($7, starts_at),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(request.name.as_deref().map(str::trim))
    .bind(request.description)
    .bind(request.price_cents)
    .bind(request.status.map(|status| status.as_str()))
    .bind(request.is_active)
    .bind(request.starts_at)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Event"))?;

    Ok(event)
}

/// Remove an event from the catalog.
///
/// Events already sold to someone, or waiting in an unpaid checkout, are
/// deactivated instead of deleted so the summary of payments stays intact.
pub async fn delete_event(pool: &DbPool, event_id: Uuid) -> Result<EventRemoval, AppError> {
    let mut tx = pool.begin().await?;

    // Lock the event so no registration can pick it up mid-removal
    let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

    if locked.is_none() {
        tx.rollback().await?;
        return Err(AppError::NotFound("Event"));
    }

    // Open checkouts carry their selection in the parked payload and will
    // write summary rows for it once paid.
    let referenced: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(SELECT 1 FROM summary_of_payments WHERE event_id = $1)
            OR EXISTS(
                SELECT 1 FROM pending_checkouts
                WHERE payload->'events' @> jsonb_build_array(
                    jsonb_build_object('event_id', $1::text)
                )
            )
        "#,
    )
    .bind(event_id)
    .fetch_one(&mut *tx)
    .await?;

    let removal = if referenced {
        sqlx::query("UPDATE events SET is_active = false, updated_at = NOW() WHERE id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        EventRemoval::Deactivated
    } else {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        EventRemoval::Deleted
    };

    tx.commit().await?;

    Ok(removal)
}
