//! Registration service - Core business logic for form submissions.
//!
//! This service handles:
//! - Conference registration (free/member, walk-in and online payment paths)
//! - Visitor and exhibitor registration
//! - Promotion of paid online checkouts into registration records
//! - Cleanup of checkouts that were never paid
//!
//! # Write Guarantees
//!
//! Duplicate-email checks run before anything is written. All rows belonging
//! to one registration are written in a single PostgreSQL transaction.

use chrono::{Duration, Utc};
use sqlx::PgConnection;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::{
        checkout::PendingCheckout,
        conference::{
            CheckoutPayload, Conference, ConferenceRegistrationRequest, Membership, PaymentMode,
            PaymentStatus, Quote, RegistrationOutcome, SelectedEventLine,
        },
        event::Event,
        exhibitor::{Exhibitor, ExhibitorRegistrationRequest},
        user::{AccountType, PersonalDetails, User, UserAccount, UserDetails},
        visitor::VisitorRegistrationRequest,
    },
    services::{
        code_service, event_service,
        payment_gateway::{
            CHECKOUT_PAID_EVENT, CheckoutRequest, LineItem, PaymentGateway, WebhookEvent,
        },
        pricing,
    },
};

const CURRENCY: &str = "PHP";

/// How a payment row is recorded alongside a registration.
#[derive(Debug, Clone)]
struct PaymentRecord {
    status: PaymentStatus,
    reference_number: Option<String>,
    checkout_session_id: Option<String>,
}

impl PaymentRecord {
    fn offline(status: PaymentStatus) -> Self {
        Self {
            status,
            reference_number: None,
            checkout_session_id: None,
        }
    }
}

/// What happened to a gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutConfirmation {
    /// Pending checkout promoted into a paid registration
    Recorded { conference_id: Uuid },
    /// Someone registered this email while the checkout was open
    AlreadyRegistered,
    /// Reference unknown: already processed, swept, or never ours
    UnknownReference,
    /// Not a paid-checkout event
    Ignored,
}

/// Register a conference attendee.
///
/// # Process
///
/// 1. Validate the payload and the membership code requirement
/// 2. Reject if the email already has a conference registration
/// 3. Resolve selected events against the active catalog and price them
/// 4. Branch:
///    - nothing to pay (member or zero total): record as FREE
///    - walk-in: record as PENDING
///    - online: park the payload in `pending_checkouts`, open a checkout session
///
/// # Errors
///
/// - `Validation` / `InvalidRequest`: malformed payload
/// - `DuplicateRegistration`: email already registered
/// - `EventUnavailable`: selection contains an inactive or unknown event
/// - `InvalidMembershipCode`: code unknown or claimed by another email
/// - `Gateway`: checkout session could not be created
pub async fn register_conference(
    pool: &DbPool,
    gateway: &dyn PaymentGateway,
    config: &Config,
    request: ConferenceRegistrationRequest,
) -> Result<RegistrationOutcome, AppError> {
    request.validate()?;

    let email = request.personal.normalized_email();

    if request.membership == Membership::Yes && request.membership_code().is_none() {
        return Err(AppError::InvalidRequest(
            "A membership code is required for member registration".to_string(),
        ));
    }

    if conference_exists(pool, &email).await? {
        return Err(AppError::DuplicateRegistration);
    }

    let catalog = event_service::active_events(pool).await?;
    let selected = pricing::resolve_selection(&request.selected_event_ids, &catalog)?;
    let quote = pricing::quote(
        &selected,
        &catalog,
        request.membership,
        config.conference_discount_cents,
    );
    let events: Vec<SelectedEventLine> = selected.iter().copied().map(Into::into).collect();

    if request.membership == Membership::Yes {
        if let Some(code) = request.membership_code() {
            code_service::ensure_code_available(pool, code, &email).await?;
        }
    }

    if !quote.requires_payment {
        let conference_id = record_registration(
            pool,
            &request,
            &events,
            &quote,
            PaymentRecord::offline(PaymentStatus::Free),
        )
        .await?;

        tracing::info!(%conference_id, email = %email, "Free conference registration recorded");
        return Ok(RegistrationOutcome::Registered {
            conference_id,
            quote,
        });
    }

    match request.payment_mode {
        PaymentMode::WalkIn => {
            let conference_id = record_registration(
                pool,
                &request,
                &events,
                &quote,
                PaymentRecord::offline(PaymentStatus::Pending),
            )
            .await?;

            tracing::info!(
                %conference_id,
                email = %email,
                total_cents = quote.total_cents,
                "Walk-in conference registration recorded"
            );
            Ok(RegistrationOutcome::PendingPayment {
                conference_id,
                quote,
            })
        }
        PaymentMode::Online => {
            start_checkout(pool, gateway, config, request, &selected, events, quote).await
        }
    }
}

/// Park the submission and open a hosted checkout session.
///
/// If the gateway call fails the parked payload is removed again.
async fn start_checkout(
    pool: &DbPool,
    gateway: &dyn PaymentGateway,
    config: &Config,
    request: ConferenceRegistrationRequest,
    selected: &[&Event],
    events: Vec<SelectedEventLine>,
    quote: Quote,
) -> Result<RegistrationOutcome, AppError> {
    let reference = Uuid::new_v4();
    let email = request.personal.normalized_email();
    let expires_at = Utc::now() + Duration::minutes(config.checkout_ttl_minutes);

    let checkout = CheckoutRequest {
        reference,
        currency: CURRENCY.to_string(),
        line_items: checkout_line_items(selected, &quote),
        description: "Conference registration".to_string(),
        customer_name: request.personal.full_name(),
        customer_email: email.clone(),
        customer_phone: request.personal.mobile_number.clone(),
        success_url: redirect_url(&config.app_base_url, "register/conference/success", reference)?,
        cancel_url: redirect_url(&config.app_base_url, "register/conference/cancelled", reference)?,
    };

    let payload = serde_json::to_value(CheckoutPayload {
        registration: request,
        events,
        quote,
    })
    .map_err(|e| AppError::InvalidRequest(format!("Failed to serialize payload: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO pending_checkouts (reference, email, payload, amount_cents, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(reference)
    .bind(&email)
    .bind(payload)
    .bind(quote.total_cents)
    .bind(expires_at)
    .execute(pool)
    .await?;

    let session = match gateway.create_checkout_session(checkout).await {
        Ok(session) => session,
        Err(e) => {
            sqlx::query("DELETE FROM pending_checkouts WHERE reference = $1")
                .bind(reference)
                .execute(pool)
                .await?;
            return Err(e);
        }
    };

    sqlx::query("UPDATE pending_checkouts SET checkout_session_id = $1 WHERE reference = $2")
        .bind(&session.id)
        .bind(reference)
        .execute(pool)
        .await?;

    tracing::info!(
        %reference,
        email = %email,
        total_cents = quote.total_cents,
        "Checkout started"
    );

    Ok(RegistrationOutcome::CheckoutRequired {
        reference,
        checkout_url: session.checkout_url,
        quote,
    })
}

/// Line items shown on the hosted checkout page.
///
/// Gateways refuse negative line items, so a discounted selection is sent as
/// one bundled line carrying the discounted total.
pub fn checkout_line_items(selected: &[&Event], quote: &Quote) -> Vec<LineItem> {
    if quote.discount_cents == 0 {
        return selected
            .iter()
            .filter(|event| event.price_cents > 0)
            .map(|event| LineItem {
                name: event.name.clone(),
                amount_cents: event.price_cents,
                quantity: 1,
            })
            .collect();
    }

    vec![LineItem {
        name: format!("Conference bundle ({} events)", selected.len()),
        amount_cents: quote.total_cents,
        quantity: 1,
    }]
}

fn redirect_url(base: &str, path: &str, reference: Uuid) -> Result<String, AppError> {
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };

    let mut url = Url::parse(&base)
        .and_then(|base| base.join(path))
        .map_err(|e| AppError::Gateway(format!("Invalid APP_BASE_URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("reference", &reference.to_string());

    Ok(url.into())
}

/// Handle a verified gateway callback.
///
/// A paid checkout is promoted into a registration marked PAID and its
/// side-store row is deleted in the same transaction, so a redelivered
/// callback finds nothing and is acknowledged as `UnknownReference`.
pub async fn confirm_checkout(
    pool: &DbPool,
    event: &WebhookEvent,
) -> Result<CheckoutConfirmation, AppError> {
    if event.data.attributes.event_type != CHECKOUT_PAID_EVENT {
        return Ok(CheckoutConfirmation::Ignored);
    }

    let Some(reference) = event.reference() else {
        tracing::warn!(event_id = %event.data.id, "Paid checkout without a usable reference");
        return Ok(CheckoutConfirmation::UnknownReference);
    };

    let mut tx = pool.begin().await?;

    let pending = sqlx::query_as::<_, PendingCheckout>(
        "SELECT * FROM pending_checkouts WHERE reference = $1 FOR UPDATE",
    )
    .bind(reference)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(pending) = pending else {
        tx.rollback().await?;
        tracing::warn!(
            %reference,
            event_id = %event.data.id,
            "Paid checkout has no pending registration; reconcile manually"
        );
        return Ok(CheckoutConfirmation::UnknownReference);
    };

    let paid_cents = event.amount_paid_cents();
    if paid_cents != 0 && paid_cents != pending.amount_cents {
        tracing::warn!(
            %reference,
            expected_cents = pending.amount_cents,
            paid_cents,
            "Paid amount differs from quoted total"
        );
    }

    let payload: CheckoutPayload = serde_json::from_value(pending.payload)
        .map_err(|e| AppError::InvalidRequest(format!("Corrupt pending checkout: {}", e)))?;

    let already_registered: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM conferences WHERE email = $1)",
    )
    .bind(&pending.email)
    .fetch_one(&mut *tx)
    .await?;

    let confirmation = if already_registered {
        tracing::warn!(
            %reference,
            email = %pending.email,
            "Checkout paid for an email that is already registered; refund manually"
        );
        CheckoutConfirmation::AlreadyRegistered
    } else {
        let payment = PaymentRecord {
            status: PaymentStatus::Paid,
            reference_number: Some(reference.to_string()),
            checkout_session_id: pending
                .checkout_session_id
                .or_else(|| Some(event.data.attributes.data.id.clone())),
        };

        let conference_id = write_registration(
            &mut tx,
            &payload.registration,
            &payload.events,
            &payload.quote,
            payment,
        )
        .await?;

        tracing::info!(%conference_id, %reference, "Online payment confirmed");
        CheckoutConfirmation::Recorded { conference_id }
    };

    sqlx::query("DELETE FROM pending_checkouts WHERE reference = $1")
        .bind(reference)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(confirmation)
}

/// Delete parked checkouts whose TTL has passed.
pub async fn purge_expired_checkouts(pool: &DbPool) -> Result<u64, AppError> {
    let purged = sqlx::query("DELETE FROM pending_checkouts WHERE expires_at < NOW()")
        .execute(pool)
        .await?
        .rows_affected();

    Ok(purged)
}

/// Register an expo visitor.
pub async fn register_visitor(
    pool: &DbPool,
    request: VisitorRegistrationRequest,
) -> Result<Uuid, AppError> {
    request.validate()?;

    let email = request.personal.normalized_email();

    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM user_accounts a
            JOIN users u ON u.id = a.user_id
            WHERE u.email = $1 AND a.account_type = $2
        )
        "#,
    )
    .bind(&email)
    .bind(AccountType::Visitor.as_str())
    .fetch_one(pool)
    .await?;

    if exists {
        return Err(AppError::DuplicateRegistration);
    }

    let mut tx = pool.begin().await?;

    let user = upsert_user(&mut tx, &email).await?;
    add_account(&mut tx, user.id, AccountType::Visitor, request.attributes()).await?;
    let details = insert_details(&mut tx, user.id, &request.personal).await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        details_id = %details.id,
        email = %user.email,
        "Visitor registered"
    );

    Ok(user.id)
}

/// Register an exhibiting company through its contact person.
pub async fn register_exhibitor(
    pool: &DbPool,
    request: ExhibitorRegistrationRequest,
) -> Result<Uuid, AppError> {
    request.validate()?;

    let email = request.contact.normalized_email();

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM exhibitors WHERE email = $1)")
        .bind(&email)
        .fetch_one(pool)
        .await?;

    if exists {
        return Err(AppError::DuplicateRegistration);
    }

    let mut tx = pool.begin().await?;

    let user = upsert_user(&mut tx, &email).await?;
    add_account(
        &mut tx,
        user.id,
        AccountType::Exhibitor,
        serde_json::json!({}),
    )
    .await?;
    insert_details(&mut tx, user.id, &request.contact).await?;

    let exhibitor = sqlx::query_as::<_, Exhibitor>(
        r#"
        INSERT INTO exhibitors (
            user_id,
            email,
            company_name,
            booth_size,
            product_categories,
            website,
            document_url
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&email)
    .bind(request.exhibitor_company.trim())
    .bind(&request.booth_size)
    .bind(serde_json::json!(request.product_categories))
    .bind(&request.website)
    .bind(&request.document_url)
    .fetch_one(&mut *tx)
    .await
    .map_err(unique_violation_as_duplicate)?;

    tx.commit().await?;

    tracing::info!(
        exhibitor_id = %exhibitor.id,
        company = %exhibitor.company_name,
        email = %exhibitor.email,
        "Exhibitor registered"
    );

    Ok(exhibitor.id)
}

async fn conference_exists(pool: &DbPool, email: &str) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM conferences WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

async fn record_registration(
    pool: &DbPool,
    request: &ConferenceRegistrationRequest,
    events: &[SelectedEventLine],
    quote: &Quote,
    payment: PaymentRecord,
) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await?;
    let conference_id = write_registration(&mut tx, request, events, quote, payment).await?;
    tx.commit().await?;

    Ok(conference_id)
}

/// Write every row of one conference registration on `conn`.
///
/// Callers own the transaction; on error they drop it and everything rolls
/// back.
async fn write_registration(
    conn: &mut PgConnection,
    request: &ConferenceRegistrationRequest,
    events: &[SelectedEventLine],
    quote: &Quote,
    payment: PaymentRecord,
) -> Result<Uuid, AppError> {
    let email = request.personal.normalized_email();

    let user = upsert_user(conn, &email).await?;
    add_account(conn, user.id, AccountType::Conference, serde_json::json!({})).await?;
    insert_details(conn, user.id, &request.personal).await?;

    let tml_code = match (request.membership, request.membership_code()) {
        (Membership::Yes, Some(code)) => {
            code_service::bind_code(conn, code, &email, user.id).await?;
            Some(code_service::normalize_code(code))
        }
        _ => None,
    };

    let conference = sqlx::query_as::<_, Conference>(
        r#"
        INSERT INTO conferences (
            user_id,
            email,
            membership,
            tml_code,
            payment_mode,
            subtotal_cents,
            discount_cents,
            total_cents,
            payment_status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&email)
    .bind(request.membership.as_str())
    .bind(tml_code)
    .bind(request.payment_mode.as_str())
    .bind(quote.subtotal_cents)
    .bind(quote.discount_cents)
    .bind(quote.total_cents)
    .bind(payment.status.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(unique_violation_as_duplicate)?;

    for event in events {
        sqlx::query(
            r#"
            INSERT INTO summary_of_payments (conference_id, event_id, price_cents)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(conference.id)
        .bind(event.event_id)
        .bind(event.price_cents)
        .execute(&mut *conn)
        .await?;
    }

    let amount_cents = match payment.status {
        PaymentStatus::Free => 0,
        PaymentStatus::Pending | PaymentStatus::Paid => quote.total_cents,
    };

    sqlx::query(
        r#"
        INSERT INTO conference_payments (
            conference_id,
            amount_cents,
            currency,
            status,
            reference_number,
            checkout_session_id,
            paid_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $4 = 'PAID' THEN NOW() END)
        "#,
    )
    .bind(conference.id)
    .bind(amount_cents)
    .bind(CURRENCY)
    .bind(payment.status.as_str())
    .bind(payment.reference_number)
    .bind(payment.checkout_session_id)
    .execute(&mut *conn)
    .await?;

    Ok(conference.id)
}

async fn upsert_user(conn: &mut PgConnection, email: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email)
        VALUES ($1)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING *
        "#,
    )
    .bind(email)
    .fetch_one(&mut *conn)
    .await?;

    Ok(user)
}

/// Attach a registration type to a user.
///
/// # Errors
///
/// `DuplicateRegistration` when the user already holds this account type.
async fn add_account(
    conn: &mut PgConnection,
    user_id: Uuid,
    account_type: AccountType,
    attributes: serde_json::Value,
) -> Result<Option<UserAccount>, AppError> {
    let inserted = sqlx::query_as::<_, UserAccount>(
        r#"
        INSERT INTO user_accounts (user_id, account_type, attributes)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, account_type) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(account_type.as_str())
    .bind(attributes)
    .fetch_optional(&mut *conn)
    .await?;

    // A conference account can predate its registration when an earlier
    // registration was deleted by an admin; only the conference row is unique.
    if inserted.is_none() && account_type != AccountType::Conference {
        return Err(AppError::DuplicateRegistration);
    }

    Ok(inserted)
}

async fn insert_details(
    conn: &mut PgConnection,
    user_id: Uuid,
    details: &PersonalDetails,
) -> Result<UserDetails, AppError> {
    let inserted = sqlx::query_as::<_, UserDetails>(
        r#"
        INSERT INTO user_details (
            user_id,
            first_name,
            middle_name,
            last_name,
            mobile_number,
            company_name,
            position,
            address,
            photo_url
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(details.first_name.trim())
    .bind(details.middle_name.as_deref().map(str::trim))
    .bind(details.last_name.trim())
    .bind(details.mobile_number.trim())
    .bind(&details.company_name)
    .bind(&details.position)
    .bind(&details.address)
    .bind(&details.photo_url)
    .fetch_one(&mut *conn)
    .await?;

    Ok(inserted)
}

/// Two submissions for one email can both pass the pre-check; the unique
/// index decides, and the loser gets the same answer as a sequential
/// duplicate.
fn unique_violation_as_duplicate(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateRegistration
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventStatus;

    fn event(name: &str, price_cents: i64) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price_cents,
            status: EventStatus::Conference.as_str().to_string(),
            is_active: true,
            starts_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn undiscounted_selection_lists_each_paid_event() {
        let day_one = event("Day 1", 300_000);
        let free_talk = event("Opening talk", 0);
        let quote = Quote {
            subtotal_cents: 300_000,
            discount_cents: 0,
            total_cents: 300_000,
            requires_payment: true,
        };

        let items = checkout_line_items(&[&day_one, &free_talk], &quote);

        assert_eq!(
            items,
            vec![LineItem {
                name: "Day 1".to_string(),
                amount_cents: 300_000,
                quantity: 1,
            }]
        );
    }

    #[test]
    fn discounted_selection_is_one_bundled_line() {
        let events = [
            event("Day 1", 300_000),
            event("Day 2", 300_000),
            event("Day 3", 150_000),
        ];
        let selected: Vec<&Event> = events.iter().collect();
        let quote = Quote {
            subtotal_cents: 750_000,
            discount_cents: 150_000,
            total_cents: 600_000,
            requires_payment: true,
        };

        let items = checkout_line_items(&selected, &quote);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount_cents, 600_000);
        assert_eq!(items[0].name, "Conference bundle (3 events)");
    }

    #[test]
    fn redirect_urls_carry_the_reference() {
        let reference = Uuid::new_v4();

        let url = redirect_url("https://expo.example.ph", "register/conference/success", reference)
            .unwrap();

        assert_eq!(
            url,
            format!("https://expo.example.ph/register/conference/success?reference={reference}")
        );
    }

    #[test]
    fn redirect_urls_keep_a_base_path() {
        let reference = Uuid::nil();

        let url = redirect_url("https://example.ph/expo/", "register/conference/cancelled", reference)
            .unwrap();

        assert!(url.starts_with("https://example.ph/expo/register/conference/cancelled?"));
    }
}
