//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use event_registration_server::build_router;
use event_registration_server::config::Config;
use event_registration_server::middleware::auth::hash_api_key;
use event_registration_server::services::payment_gateway::{
    CHECKOUT_PAID_EVENT, MockPaymentGateway, SIGNATURE_HEADER, sign_payload,
};
use event_registration_server::state::AppState;

pub const WEBHOOK_SECRET: &str = "whsk_integration_test";

/// Router wired to the given pool and an in-process gateway.
///
/// The gateway handle is returned so tests can inspect checkout requests.
pub fn build_test_app(pool: PgPool) -> (Router, Arc<MockPaymentGateway>) {
    build_test_app_with_gateway(pool, MockPaymentGateway::recording())
}

pub fn build_test_app_with_gateway(
    pool: PgPool,
    gateway: MockPaymentGateway,
) -> (Router, Arc<MockPaymentGateway>) {
    let mut config = Config::with_database_url("postgres://unused");
    config.paymongo_webhook_secret = Some(WEBHOOK_SECRET.to_string());
    config.app_base_url = "https://register.example.test".to_string();

    let gateway = Arc::new(gateway);
    let state = AppState {
        pool,
        gateway: gateway.clone(),
        config: Arc::new(config),
    };

    (build_router(state), gateway)
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    api_key: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(key) = api_key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body), None).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Insert an active catalog event and return its id.
pub async fn seed_event(pool: &PgPool, name: &str, price_cents: i64, status: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO events (name, price_cents, status) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(price_cents)
    .bind(status)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_code(pool: &PgPool, code: &str, organization: &str) {
    sqlx::query("INSERT INTO code_distributions (code, organization) VALUES ($1, $2)")
        .bind(code)
        .bind(organization)
        .execute(pool)
        .await
        .unwrap();
}

/// Store an active admin key and return the raw value.
pub async fn seed_api_key(pool: &PgPool) -> String {
    let raw = "adm_test_key";
    sqlx::query("INSERT INTO api_keys (key_hash, label) VALUES ($1, $2)")
        .bind(hash_api_key(raw))
        .bind("registration desk")
        .execute(pool)
        .await
        .unwrap();
    raw.to_string()
}

pub async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn personal(email: &str) -> Value {
    json!({
        "email": email,
        "first_name": "Maria",
        "last_name": "Santos",
        "mobile_number": "09171234567",
        "company_name": "Santos Logistics",
        "position": "Operations Manager"
    })
}

/// Merge `extra` into the personal-details block.
pub fn form(email: &str, extra: Value) -> Value {
    let mut body = personal(email);
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
    }
    body
}

/// A paid-checkout callback body as the gateway would send it.
pub fn paid_event(reference: &str, amount_cents: i64) -> Value {
    checkout_event(CHECKOUT_PAID_EVENT, reference, amount_cents)
}

pub fn checkout_event(event_type: &str, reference: &str, amount_cents: i64) -> Value {
    json!({
        "data": {
            "id": "evt_test_1",
            "type": "event",
            "attributes": {
                "type": event_type,
                "livemode": false,
                "data": {
                    "id": "cs_mock_session",
                    "type": "checkout_session",
                    "attributes": {
                        "reference_number": reference,
                        "payments": [
                            { "id": "pay_test_1", "attributes": { "amount": amount_cents } }
                        ]
                    }
                }
            }
        }
    })
}

/// Post `body` to the webhook endpoint signed with `secret`.
pub async fn post_signed_webhook(app: Router, body: &Value, secret: &str) -> Response<Body> {
    let raw = body.to_string();
    let signature = sign_payload(secret, 1_741_000_000, raw.as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/payments/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(raw))
        .unwrap();

    app.oneshot(request).await.unwrap()
}

/// Open an online checkout for `email` and return its reference.
pub async fn open_checkout(app: Router, email: &str, event_id: Uuid) -> String {
    let body = form(
        email,
        json!({ "selected_event_ids": [event_id], "payment_mode": "ONLINE" }),
    );
    let response = post_json(app, "/api/v1/registrations/conference", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    body_json(response).await["reference"]
        .as_str()
        .unwrap()
        .to_string()
}
