//! User, account and personal-detail models.
//!
//! One person is one `users` row keyed by email. Each registration type the
//! person completes adds a `user_accounts` row, and each submission records
//! its `user_details` snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Registration type attached to a user.
///
/// `attributes` holds the type-specific answers (visitor interests, how they
/// heard about the expo, ...).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_type: String,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub mobile_number: String,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub address: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Visitor,
    Exhibitor,
    Conference,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Visitor => "VISITOR",
            AccountType::Exhibitor => "EXHIBITOR",
            AccountType::Conference => "CONFERENCE",
        }
    }
}

/// Personal details shared by every registration form.
///
/// `photo_url` points at the face-capture image the browser already uploaded
/// to object storage.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PersonalDetails {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(max = 100))]
    pub middle_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(length(min = 7, max = 20, message = "Enter a valid mobile number"))]
    pub mobile_number: String,

    #[validate(length(max = 200))]
    pub company_name: Option<String>,

    #[validate(length(max = 100))]
    pub position: Option<String>,

    #[validate(length(max = 500))]
    pub address: Option<String>,

    #[validate(url)]
    pub photo_url: Option<String>,
}

impl PersonalDetails {
    /// Lower-cased, trimmed email used for every uniqueness check.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().map(str::trim) {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// Response body for visitor and exhibitor submissions.
#[derive(Debug, Serialize)]
pub struct RegistrationReceipt {
    pub status: &'static str,
    pub id: Uuid,
}

impl RegistrationReceipt {
    pub fn registered(id: Uuid) -> Self {
        Self {
            status: "registered",
            id,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(email: &str) -> PersonalDetails {
        PersonalDetails {
            email: email.to_string(),
            first_name: "Maria".to_string(),
            middle_name: None,
            last_name: "Santos".to_string(),
            mobile_number: "09171234567".to_string(),
            company_name: Some("Acme Logistics".to_string()),
            position: None,
            address: None,
            photo_url: None,
        }
    }

    #[test]
    fn valid_details_pass() {
        assert!(details("maria@example.com").validate().is_ok());
    }

    #[test]
    fn rejects_malformed_email_and_blank_names() {
        let mut input = details("not-an-email");
        input.first_name = String::new();

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("first_name"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn email_is_normalized_for_lookups() {
        assert_eq!(
            details("  Maria@Example.COM ").normalized_email(),
            "maria@example.com"
        );
    }

    #[test]
    fn full_name_skips_blank_middle_name() {
        let mut input = details("maria@example.com");
        assert_eq!(input.full_name(), "Maria Santos");

        input.middle_name = Some("Cruz".to_string());
        assert_eq!(input.full_name(), "Maria Cruz Santos");
    }
}
