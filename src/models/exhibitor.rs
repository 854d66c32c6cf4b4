//! Exhibitor registration models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::PersonalDetails;

/// Represents a row of the `exhibitors` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Exhibitor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub company_name: String,
    pub booth_size: Option<String>,
    pub product_categories: serde_json::Value,
    pub website: Option<String>,

    /// Public URL of the uploaded company profile / permit document
    pub document_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Exhibitor form submission. The personal block describes the contact person.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExhibitorRegistrationRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub contact: PersonalDetails,

    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub exhibitor_company: String,

    #[validate(length(max = 50))]
    pub booth_size: Option<String>,

    #[serde(default)]
    #[validate(length(max = 20))]
    pub product_categories: Vec<String>,

    #[validate(url)]
    pub website: Option<String>,

    #[validate(url)]
    pub document_url: Option<String>,
}

/// One row of the admin exhibitor table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ExhibitorRow {
    pub id: Uuid,
    pub email: String,
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    pub booth_size: Option<String>,
    pub product_categories: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
