//! API key authentication middleware for the admin back-office.
//!
//! This middleware intercepts every admin request to:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{db::DbPool, error::AppError, models::api_key::ApiKey};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Authentication context attached to admin requests.
///
/// Handlers extract it with `Extension<AuthContext>` to attribute changes.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub api_key_id: Uuid,

    /// Who the key was issued to
    pub label: String,
}

/// Hex-encoded SHA-256 of a raw API key, as stored in `api_keys.key_hash`.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// API key authentication middleware function.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer abc123xyz
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if authenticated successfully (calls next handler)
/// - `Err(AppError::InvalidApiKey)` if authentication fails (returns 401)
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    // Expected format: "Bearer <api_key>"
    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidApiKey)?;

    let api_key_record = sqlx::query_as::<_, ApiKey>(
        "SELECT id, key_hash, label, created_at, is_active
         FROM api_keys
         WHERE key_hash = $1 AND is_active = true",
    )
    .bind(hash_api_key(api_key))
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    request.extensions_mut().insert(AuthContext {
        api_key_id: api_key_record.id,
        label: api_key_record.label,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_keys_as_lowercase_hex_sha256() {
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
