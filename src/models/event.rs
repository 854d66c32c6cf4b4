//! Event catalog models.
//!
//! An event is one sellable session of the expo: a conference day, a workshop
//! or a side event. Prices are stored in centavos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Represents an event record from the database.
///
/// # Database Table
///
/// Maps to the `events` table. `status` holds one of the [`EventStatus`]
/// strings; `is_active = false` hides the event from the public catalog
/// while keeping it referenced by past registrations.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// Price in centavos
    pub price_cents: i64,

    pub status: String,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether this event counts towards the conference bundle discount.
    pub fn is_conference(&self) -> bool {
        self.status == EventStatus::Conference.as_str()
    }
}

/// Kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Conference,
    Workshop,
    SideEvent,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Conference => "CONFERENCE",
            EventStatus::Workshop => "WORKSHOP",
            EventStatus::SideEvent => "SIDE_EVENT",
        }
    }
}

/// Request body for creating an event.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Day 1 Plenary",
///   "price_cents": 300000,
///   "status": "CONFERENCE"
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 0))]
    pub price_cents: i64,

    pub status: EventStatus,

    #[serde(default = "default_active")]
    pub is_active: bool,

    pub starts_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Partial update of an event. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,

    pub status: Option<EventStatus>,

    pub is_active: Option<bool>,

    pub starts_at: Option<DateTime<Utc>>,
}
