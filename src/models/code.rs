//! Membership (TML) code models.
//!
//! A code entitles one person from a member organization to a free conference
//! registration. Once bound to an email it cannot be used by anyone else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Represents a row of the `code_distributions` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CodeDistribution {
    pub id: Uuid,
    pub code: String,
    pub organization: String,

    /// Email the code was claimed by, `None` while unclaimed
    pub bound_email: Option<String>,
    pub bound_user_id: Option<Uuid>,
    pub bound_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CodeDistribution {
    /// A code is usable by `email` when unclaimed or already claimed by that
    /// same email (a resubmission).
    pub fn is_available_to(&self, email: &str) -> bool {
        match &self.bound_email {
            None => true,
            Some(bound) => bound.eq_ignore_ascii_case(email),
        }
    }
}

/// Request body for issuing a batch of codes to an organization.
///
/// # JSON Example
///
/// ```json
/// {
///   "organization": "Philippine Truckers Association",
///   "codes": ["TML-0001", "TML-0002"]
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCodesRequest {
    #[validate(length(min = 1, max = 200))]
    pub organization: String,

    #[validate(length(min = 1, max = 1000))]
    pub codes: Vec<String>,
}

/// Request body for `POST /api/v1/codes/validate`.
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCodeRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,

    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateCodeResponse {
    pub valid: bool,
    pub organization: String,
}
