//! Visitor registration models.
//!
//! Visitors attend the expo floor for free. Their answers to the survey
//! questions are kept in the account's `attributes`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::PersonalDetails;

/// Visitor form submission.
///
/// `referral_source` is "OTHERS" when the visitor typed a free-form answer
/// into `referral_source_other`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VisitorRegistrationRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub personal: PersonalDetails,

    #[serde(default)]
    #[validate(length(max = 20))]
    pub interests: Vec<String>,

    #[validate(length(max = 100))]
    pub referral_source: Option<String>,

    #[validate(length(max = 200))]
    pub referral_source_other: Option<String>,
}

impl VisitorRegistrationRequest {
    /// Survey answers stored on the visitor account.
    pub fn attributes(&self) -> serde_json::Value {
        let referral = match self.referral_source.as_deref() {
            Some("OTHERS") => self.referral_source_other.clone(),
            other => other.map(str::to_string),
        };

        serde_json::json!({
            "interests": self.interests,
            "referral_source": referral,
        })
    }
}

/// One row of the admin visitor table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct VisitorRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    pub company_name: Option<String>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
