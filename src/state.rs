//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, db::DbPool, services::payment_gateway::PaymentGateway};

/// State injected into every handler.
///
/// Handlers that only touch the database extract `State<DbPool>` directly.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Arc<Config>,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
