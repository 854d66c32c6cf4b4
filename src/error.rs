//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::ValidationErrors;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Validation Errors**: Request bodies that fail their field rules
/// - **Business Rule Errors**: Duplicate registrations, bad membership codes, retired events
/// - **Authentication Errors**: Invalid admin API keys or webhook signatures
/// - **Gateway Errors**: The payment provider refused or could not be reached
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// One or more request fields failed validation.
    ///
    /// Returns HTTP 400 with the per-field messages under `details`.
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    /// Body is not JSON or does not match the expected shape.
    ///
    /// Returns HTTP 400 with the deserializer message under `details`.
    #[error("Malformed request body")]
    MalformedBody(#[from] JsonRejection),

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// A registration of this kind already exists for the email.
    #[error("A registration already exists for this email")]
    DuplicateRegistration,

    /// Membership code is unknown or already bound to someone else.
    #[error("Invalid membership code")]
    InvalidMembershipCode(String),

    /// Selected event does not exist or is no longer active.
    #[error("Event {0} is no longer available")]
    EventUnavailable(Uuid),

    /// Write lost a race with another writer (e.g. a stale draft version).
    #[error("Conflict")]
    Conflict(String),

    /// Requested resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Admin API key is missing, invalid, or inactive.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Payment webhook signature did not verify.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Payment gateway call failed.
    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": "Human-readable error message",
///   "code": "error_type",
///   "details": { "email": [ { "code": "email", ... } ] }
/// }
/// ```
///
/// `details` is only present for validation failures and malformed bodies.
///
/// # Status Code Mapping
///
/// - `Validation`, `MalformedBody`, `InvalidRequest`, `DuplicateRegistration`,
///   `InvalidMembershipCode`, `EventUnavailable` → 400 Bad Request
/// - `InvalidApiKey`, `InvalidSignature` → 401 Unauthorized
/// - `NotFound` → 404 Not Found
/// - `Conflict` → 409 Conflict
/// - `Gateway` → 502 Bad Gateway
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
            ),
            AppError::MalformedBody(_) => {
                (StatusCode::BAD_REQUEST, "malformed_body", self.to_string())
            }
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::DuplicateRegistration => (
                StatusCode::BAD_REQUEST,
                "duplicate_registration",
                self.to_string(),
            ),
            AppError::InvalidMembershipCode(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_membership_code", msg.clone())
            }
            AppError::EventUnavailable(_) => (
                StatusCode::BAD_REQUEST,
                "event_unavailable",
                self.to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                self.to_string(),
            ),
            AppError::Gateway(detail) => {
                tracing::error!(error = %detail, "payment gateway call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "payment_gateway_error",
                    "The payment provider could not start a checkout".to_string(),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });

        match &self {
            AppError::Validation(errors) => {
                body["details"] = serde_json::to_value(errors).unwrap_or_default();
            }
            AppError::MalformedBody(rejection) => {
                body["details"] = json!(rejection.body_text());
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use validator::ValidationError;

    async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_bad_request() {
        let (status, json) = error_to_response(AppError::DuplicateRegistration).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "duplicate_registration");
        assert_eq!(json["error"], "A registration already exists for this email");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn validation_errors_carry_field_details() {
        let mut errors = ValidationErrors::new();
        errors.add("email", ValidationError::new("email"));

        let (status, json) = error_to_response(AppError::Validation(errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "validation_error");
        assert_eq!(json["details"]["email"][0]["code"], "email");
    }

    #[tokio::test]
    async fn database_errors_hide_their_cause() {
        let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn missing_resources_map_to_404() {
        let (status, json) = error_to_response(AppError::NotFound("Event")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Event not found");
    }
}
