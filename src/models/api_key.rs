//! Admin API key model.
//!
//! Back-office requests authenticate with a bearer key. Only the SHA-256 hash
//! of each key is stored.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `key_hash`: SHA-256 hash of the actual API key
/// - `label`: Who the key was issued to (e.g. "registration desk")
/// - `created_at`: When the key was created
/// - `is_active`: Whether the key is currently valid
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    /// SHA-256 hash of the actual API key (64 hex characters)
    pub key_hash: String,

    pub label: String,

    pub created_at: DateTime<Utc>,

    /// Inactive keys are rejected during authentication.
    pub is_active: bool,
}
