//! Liveness endpoint for the load balancer and the organizers' status page.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `paymongo` or `mock`
    pub payment_gateway: &'static str,
    /// Online checkouts opened but not yet confirmed
    pub open_checkouts: i64,
    pub checked_at: DateTime<Utc>,
}

/// `GET /health`
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "payment_gateway": "paymongo",
///   "open_checkouts": 3,
///   "checked_at": "2025-03-01T09:00:00Z"
/// }
/// ```
///
/// A database failure yields the standard 500 error body.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let open_checkouts: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pending_checkouts WHERE expires_at > NOW()")
            .fetch_one(&state.pool)
            .await?;

    let payment_gateway = if state.config.paymongo_secret_key.is_some() {
        "paymongo"
    } else {
        "mock"
    };

    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payment_gateway,
        open_checkouts,
        checked_at: Utc::now(),
    }))
}
