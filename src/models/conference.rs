//! Conference registration models.
//!
//! This module defines:
//! - `Conference`, `ConferencePayment`: database entities
//! - `SelectedEventLine`: a `summary_of_payments` row joined with its event name
//! - `ConferenceRegistrationRequest`: the attendee form submission
//! - `Quote` and `RegistrationOutcome`: what the API answers with
//! - Registrant views used by the admin back-office

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{event::Event, user::PersonalDetails};

/// Represents a conference registration record.
///
/// # Database Table
///
/// Maps to the `conferences` table. `email` is unique: one conference
/// registration per person. Amounts are centavos.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Conference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub membership: String,
    pub tml_code: Option<String>,
    pub payment_mode: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One payment attempt or settlement for a conference registration.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ConferencePayment {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub reference_number: Option<String>,
    pub checkout_session_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Whether the registrant belongs to a recognized member organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Membership {
    Yes,
    #[default]
    No,
}

impl Membership {
    pub fn as_str(self) -> &'static str {
        match self {
            Membership::Yes => "YES",
            Membership::No => "NO",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    #[default]
    Online,
    WalkIn,
}

impl PaymentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMode::Online => "ONLINE",
            PaymentMode::WalkIn => "WALK_IN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Nothing to pay: member registration or a zero total
    Free,
    /// Walk-in registrant who settles at the venue
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Free => "FREE",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }
}

/// Conference attendee form submission.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "maria@example.com",
///   "first_name": "Maria",
///   "last_name": "Santos",
///   "mobile_number": "09171234567",
///   "membership": "NO",
///   "selected_event_ids": ["550e8400-e29b-41d4-a716-446655440000"],
///   "payment_mode": "ONLINE"
/// }
/// ```
///
/// The same shape is stored verbatim in the pending-checkout side-store while
/// an online payment is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConferenceRegistrationRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub personal: PersonalDetails,

    #[serde(default)]
    pub membership: Membership,

    /// Required when `membership` is `YES`
    #[validate(length(max = 64))]
    pub tml_code: Option<String>,

    #[validate(length(min = 1, message = "Select at least one event"))]
    pub selected_event_ids: Vec<Uuid>,

    #[serde(default)]
    pub payment_mode: PaymentMode,
}

impl ConferenceRegistrationRequest {
    /// Trimmed membership code, if one was entered.
    pub fn membership_code(&self) -> Option<&str> {
        self.tml_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// Request body for `POST /api/v1/registrations/quote`.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub selected_event_ids: Vec<Uuid>,

    #[serde(default)]
    pub membership: Membership,
}

/// Price breakdown for a selection of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub requires_payment: bool,
}

/// Result of a conference submission.
///
/// # JSON Examples
///
/// ```json
/// { "status": "registered", "conference_id": "...", "quote": { ... } }
/// { "status": "checkout_required", "reference": "...", "checkout_url": "https://...", "quote": { ... } }
/// ```
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// Free or member registration, fully recorded
    Registered { conference_id: Uuid, quote: Quote },

    /// Walk-in registration, recorded and awaiting payment at the venue
    PendingPayment { conference_id: Uuid, quote: Quote },

    /// Online payment: redirect the browser to `checkout_url`
    CheckoutRequired {
        reference: Uuid,
        checkout_url: String,
        quote: Quote,
    },
}

/// One row of the admin registrant table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RegistrantRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    pub company_name: Option<String>,
    pub membership: String,
    pub tml_code: Option<String>,
    pub payment_mode: String,
    pub total_cents: i64,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

/// Event line shown in a registrant's detail dialog.
///
/// Also frozen into the pending-checkout payload so a paid checkout is
/// recorded at the prices the registrant saw.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct SelectedEventLine {
    pub event_id: Uuid,
    pub name: String,
    pub price_cents: i64,
}

impl From<&Event> for SelectedEventLine {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id,
            name: event.name.clone(),
            price_cents: event.price_cents,
        }
    }
}

/// What waits in the pending-checkout side-store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPayload {
    pub registration: ConferenceRegistrationRequest,
    pub events: Vec<SelectedEventLine>,
    pub quote: Quote,
}

#[derive(Debug, Serialize)]
pub struct RegistrantDetail {
    #[serde(flatten)]
    pub registrant: RegistrantRow,
    pub events: Vec<SelectedEventLine>,
    pub payments: Vec<ConferencePayment>,
}

/// Admin edit of a registrant. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRegistrantRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,

    #[validate(length(min = 7, max = 20))]
    pub mobile_number: Option<String>,

    #[validate(length(max = 200))]
    pub company_name: Option<String>,

    #[validate(length(max = 100))]
    pub position: Option<String>,
}
