//! Issuing admin API keys.
//!
//! The raw key is returned exactly once; only its hash is persisted.

use crate::{db::DbPool, error::AppError, middleware::auth::hash_api_key, models::api_key::ApiKey};

/// Prefix on every issued key.
const KEY_PREFIX: &str = "adm_";

/// Create a new active key for `label`.
///
/// # Returns
///
/// The stored record and the raw key to hand to the operator.
pub async fn issue_api_key(pool: &DbPool, label: &str) -> Result<(ApiKey, String), AppError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(AppError::InvalidRequest("API key label is required".to_string()));
    }

    let raw_key = generate_api_key();

    let api_key = sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (key_hash, label)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(hash_api_key(&raw_key))
    .bind(label)
    .fetch_one(pool)
    .await?;

    tracing::info!(api_key_id = %api_key.id, label = %api_key.label, "API key issued");

    Ok((api_key, raw_key))
}

/// 32 random bytes, hex encoded, behind [`KEY_PREFIX`].
fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("{}{}", KEY_PREFIX, hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_prefixed_and_unique() {
        let first = generate_api_key();
        let second = generate_api_key();

        assert!(first.starts_with(KEY_PREFIX));
        assert_eq!(first.len(), KEY_PREFIX.len() + 64);
        assert_ne!(first, second);
    }
}
