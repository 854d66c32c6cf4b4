//! PostgreSQL pool and schema migrations.
//!
//! Registrations, the event catalog, membership codes and the pending-checkout
//! side-store share one database.

use std::time::Duration;

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

pub type DbPool = Pool<Postgres>;

/// Longest a request waits for a free connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Apply pending files from `migrations/`. Already-applied files are tracked
/// in `_sqlx_migrations` and skipped.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
