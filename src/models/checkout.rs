//! Pending online checkouts.
//!
//! While the browser is on the gateway's hosted page, the registration lives
//! only here. The confirmation webhook promotes it into real records; the
//! sweeper drops it once `expires_at` passes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingCheckout {
    /// Reference number sent to the gateway and echoed back by its webhook
    pub reference: Uuid,
    pub email: String,

    /// Serialized `ConferenceRegistrationRequest`
    pub payload: serde_json::Value,
    pub amount_cents: i64,
    pub checkout_session_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
