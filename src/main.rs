//! Event Registration Service - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Pick the payment gateway
//! 5. Start the sweeper for expired checkouts and stale drafts
//! 6. Build HTTP router and start server on configured port
//!
//! # Commands
//!
//! ```text
//! event_registration_server                      # run the server
//! event_registration_server issue-api-key <label> # print a new admin key
//! ```

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use event_registration_server::{
    build_router,
    config::Config,
    db::{self, DbPool},
    services::{
        api_key_service,
        payment_gateway::{MockPaymentGateway, PayMongoGateway, PaymentGateway},
        draft_service, registration_service,
    },
    state::AppState,
};
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let mut args = std::env::args().skip(1);
    if let Some(command) = args.next() {
        return run_command(&pool, &command, args.collect()).await;
    }

    let gateway: Arc<dyn PaymentGateway> = match config.paymongo_secret_key.as_deref() {
        Some(secret_key) => {
            Arc::new(PayMongoGateway::new(config.paymongo_api_base.clone(), secret_key)?)
        }
        None => {
            tracing::warn!("PAYMONGO_SECRET_KEY not set; online payments use the mock gateway");
            Arc::new(MockPaymentGateway::new())
        }
    };

    tokio::spawn(sweep(pool.clone(), config.draft_ttl_days));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState {
        pool,
        gateway,
        config: Arc::new(config),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_command(pool: &DbPool, command: &str, args: Vec<String>) -> anyhow::Result<()> {
    match command {
        "issue-api-key" => {
            let label = args.join(" ");
            let (api_key, raw_key) = api_key_service::issue_api_key(pool, &label).await?;
            println!("{}\t{}", api_key.id, raw_key);
            Ok(())
        }
        other => anyhow::bail!("unknown command: {other}"),
    }
}

/// Drop checkout references whose hosted page has expired and drafts that
/// have sat untouched past `draft_ttl_days`.
async fn sweep(pool: DbPool, draft_ttl_days: i32) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        interval.tick().await;

        match registration_service::purge_expired_checkouts(&pool).await {
            Ok(0) => {}
            Ok(purged) => tracing::info!(purged, "Expired checkouts removed"),
            Err(e) => tracing::error!(error = %e, "Failed to purge expired checkouts"),
        }

        match draft_service::purge_stale_drafts(&pool, draft_ttl_days).await {
            Ok(0) => {}
            Ok(purged) => tracing::info!(purged, "Stale drafts removed"),
            Err(e) => tracing::error!(error = %e, "Failed to purge stale drafts"),
        }
    }
}
