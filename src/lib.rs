//! Event registration service.
//!
//! A REST API behind the visitor, exhibitor and conference registration
//! forms, plus the admin back-office used by the organizers.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Payments**: hosted checkout sessions, confirmed by signed webhooks
//! - **Authentication**: admin routes require an API key (SHA-256 hashed at rest)
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the HTTP router with every route and middleware layer.
pub fn build_router(state: AppState) -> Router {
    // Back-office routes
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/registrants",
            get(handlers::admin::list_registrants),
        )
        .route(
            "/api/v1/admin/registrants/{id}",
            get(handlers::admin::get_registrant)
                .put(handlers::admin::update_registrant)
                .delete(handlers::admin::delete_registrant),
        )
        .route(
            "/api/v1/admin/registrants/{id}/mark-paid",
            post(handlers::admin::mark_registrant_paid),
        )
        .route("/api/v1/admin/visitors", get(handlers::admin::list_visitors))
        .route(
            "/api/v1/admin/exhibitors",
            get(handlers::admin::list_exhibitors),
        )
        .route(
            "/api/v1/admin/exhibitors/{id}",
            delete(handlers::admin::delete_exhibitor),
        )
        .route(
            "/api/v1/admin/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/api/v1/admin/events/{id}",
            put(handlers::events::update_event).delete(handlers::events::delete_event),
        )
        .route(
            "/api/v1/admin/codes",
            get(handlers::codes::list_codes).post(handlers::codes::create_codes),
        )
        .route(
            "/api/v1/admin/codes/{id}",
            delete(handlers::codes::delete_code),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/events", get(handlers::events::list_active_events))
        .route(
            "/api/v1/registrations/quote",
            post(handlers::registrations::quote),
        )
        .route(
            "/api/v1/registrations/conference",
            post(handlers::registrations::register_conference),
        )
        .route(
            "/api/v1/registrations/visitor",
            post(handlers::registrations::register_visitor),
        )
        .route(
            "/api/v1/registrations/exhibitor",
            post(handlers::registrations::register_exhibitor),
        )
        .route("/api/v1/codes/validate", post(handlers::codes::validate_code))
        .route(
            "/api/v1/drafts/{kind}/{key}",
            get(handlers::drafts::get_draft)
                .put(handlers::drafts::save_draft)
                .delete(handlers::drafts::delete_draft),
        )
        .route(
            "/api/v1/payments/webhook",
            post(handlers::payments::payment_webhook),
        )
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser access is limited to the configured registration site.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            tracing::warn!("CORS_ORIGIN is not a valid header value; cross-origin requests disabled");
            layer
        }
        None => layer,
    }
}
