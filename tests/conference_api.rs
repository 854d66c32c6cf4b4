//! Integration tests for conference registration and the payment callback.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::{
    WEBHOOK_SECRET, body_json, checkout_event, count, form, open_checkout, paid_event,
    post_json, post_signed_webhook, seed_code, seed_event,
};
use event_registration_server::services::payment_gateway::MockPaymentGateway;
use event_registration_server::services::registration_service;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

#[sqlx::test(migrations = "./migrations")]
async fn quote_applies_bundle_discount_for_all_three_conference_days(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let day2 = seed_event(&pool, "Conference Day 2", 300_000, "CONFERENCE").await;
    let day3 = seed_event(&pool, "Conference Day 3", 150_000, "CONFERENCE").await;
    let (app, _) = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/registrations/quote",
        json!({ "selected_event_ids": [day1, day2, day3] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let quote = body_json(response).await;
    assert_eq!(quote["subtotal_cents"], 750_000);
    assert_eq!(quote["discount_cents"], 150_000);
    assert_eq!(quote["total_cents"], 600_000);
    assert_eq!(quote["requires_payment"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn member_with_valid_code_registers_free(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    seed_code(&pool, "TML-0001", "Truckers Association").await;
    let (app, gateway) = common::build_test_app(pool.clone());

    let body = form(
        "maria@example.com",
        json!({
            "membership": "YES",
            "tml_code": "tml-0001",
            "selected_event_ids": [day1],
            "payment_mode": "ONLINE"
        }),
    );
    let response = post_json(app, "/api/v1/registrations/conference", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "registered");
    assert_eq!(json["quote"]["total_cents"], 300_000);
    assert_eq!(json["quote"]["requires_payment"], false);
    assert!(gateway.requests().is_empty());

    let (status, bound_email): (String, Option<String>) = sqlx::query_as(
        r#"
        SELECT c.payment_status, d.bound_email
        FROM conferences c, code_distributions d
        WHERE d.code = 'TML-0001'
        "#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "FREE");
    assert_eq!(bound_email.as_deref(), Some("maria@example.com"));
    assert_eq!(count(&pool, "summary_of_payments").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn member_without_code_is_rejected(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, _) = common::build_test_app(pool.clone());

    let body = form(
        "maria@example.com",
        json!({ "membership": "YES", "selected_event_ids": [day1] }),
    );
    let response = post_json(app, "/api/v1/registrations/conference", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_request");
    assert_eq!(count(&pool, "conferences").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn code_bound_to_another_email_is_rejected(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    seed_code(&pool, "TML-0002", "Truckers Association").await;
    sqlx::query("UPDATE code_distributions SET bound_email = 'first@example.com', bound_at = NOW()")
        .execute(&pool)
        .await
        .unwrap();
    let (app, _) = common::build_test_app(pool.clone());

    let body = form(
        "second@example.com",
        json!({ "membership": "YES", "tml_code": "TML-0002", "selected_event_ids": [day1] }),
    );
    let response = post_json(app, "/api/v1/registrations/conference", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_membership_code");
    assert_eq!(count(&pool, "conferences").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn walk_in_registration_is_recorded_as_pending(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, gateway) = common::build_test_app(pool.clone());

    let body = form(
        "walkin@example.com",
        json!({ "selected_event_ids": [day1], "payment_mode": "WALK_IN" }),
    );
    let response = post_json(app, "/api/v1/registrations/conference", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending_payment");
    assert_eq!(json["quote"]["total_cents"], 300_000);
    assert!(gateway.requests().is_empty());

    let status: String = sqlx::query_scalar("SELECT payment_status FROM conferences")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "PENDING");
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_email_is_rejected_without_writing(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, _) = common::build_test_app(pool.clone());

    let body = form(
        "repeat@example.com",
        json!({ "selected_event_ids": [day1], "payment_mode": "WALK_IN" }),
    );
    let first = post_json(app.clone(), "/api/v1/registrations/conference", body.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let mut again = body;
    again["email"] = json!("Repeat@Example.com");
    let second = post_json(app, "/api/v1/registrations/conference", again).await;

    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(second).await["code"], "duplicate_registration");
    assert_eq!(count(&pool, "conferences").await, 1);
    assert_eq!(count(&pool, "summary_of_payments").await, 1);
    assert_eq!(count(&pool, "user_details").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn inactive_event_cannot_be_selected(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    sqlx::query("UPDATE events SET is_active = false")
        .execute(&pool)
        .await
        .unwrap();
    let (app, _) = common::build_test_app(pool.clone());

    let body = form("late@example.com", json!({ "selected_event_ids": [day1] }));
    let response = post_json(app, "/api/v1/registrations/conference", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "event_unavailable");
}

#[sqlx::test(migrations = "./migrations")]
async fn online_payment_is_recorded_only_after_signed_callback(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, gateway) = common::build_test_app(pool.clone());

    let body = form(
        "online@example.com",
        json!({ "selected_event_ids": [day1], "payment_mode": "ONLINE" }),
    );
    let response = post_json(app.clone(), "/api/v1/registrations/conference", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "checkout_required");
    let reference = json["reference"].as_str().unwrap().to_string();
    assert!(json["checkout_url"].as_str().unwrap().ends_with(&reference));

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_cents(), 300_000);
    assert!(requests[0].success_url.contains(&reference));

    // Nothing is registered until the gateway confirms payment
    assert_eq!(count(&pool, "conferences").await, 0);
    assert_eq!(count(&pool, "pending_checkouts").await, 1);

    let event = paid_event(&reference, 300_000);
    let response = post_signed_webhook(app.clone(), &event, WEBHOOK_SECRET).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert!(ack["result"]["recorded"]["conference_id"].is_string());

    let (status, total): (String, i64) =
        sqlx::query_as("SELECT payment_status, total_cents FROM conferences")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "PAID");
    assert_eq!(total, 300_000);
    assert_eq!(count(&pool, "pending_checkouts").await, 0);

    let stored_reference: Option<String> =
        sqlx::query_scalar("SELECT reference_number FROM conference_payments")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored_reference.as_deref(), Some(reference.as_str()));

    // Redelivery finds nothing to do
    let response = post_signed_webhook(app, &event, WEBHOOK_SECRET).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], "unknown_reference");
    assert_eq!(count(&pool, "conferences").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn callback_with_bad_signature_is_rejected(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);

    let event = paid_event("00000000-0000-0000-0000-000000000000", 100);
    let response = post_signed_webhook(app, &event, "not-the-secret").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "invalid_signature");
}

#[sqlx::test(migrations = "./migrations")]
async fn gateway_failure_leaves_no_pending_checkout(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, _) = common::build_test_app_with_gateway(pool.clone(), MockPaymentGateway::failing());

    let body = form("online@example.com", json!({ "selected_event_ids": [day1] }));
    let response = post_json(app, "/api/v1/registrations/conference", body).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(count(&pool, "pending_checkouts").await, 0);
    assert_eq!(count(&pool, "conferences").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn body_that_does_not_match_the_form_is_a_json_400(pool: PgPool) {
    seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, _) = common::build_test_app(pool.clone());

    let missing = form("maria@example.com", json!({ "payment_mode": "WALK_IN" }));
    let response = post_json(app.clone(), "/api/v1/registrations/conference", missing).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let json = body_json(response).await;
    assert_eq!(json["code"], "malformed_body");
    assert!(json["details"].as_str().unwrap().contains("selected_event_ids"));

    let bad_id = form("maria@example.com", json!({ "selected_event_ids": ["not-a-uuid"] }));
    let response = post_json(app.clone(), "/api/v1/registrations/conference", bad_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "malformed_body");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/registrations/quote")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "malformed_body");

    assert_eq!(count(&pool, "conferences").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn paid_callback_for_email_registered_meanwhile_writes_nothing(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, _) = common::build_test_app(pool.clone());

    let reference = open_checkout(app.clone(), "late@example.com", day1).await;

    // Same person gives up on the card page and registers at the desk
    let walk_in = form(
        "late@example.com",
        json!({ "selected_event_ids": [day1], "payment_mode": "WALK_IN" }),
    );
    let response = post_json(app.clone(), "/api/v1/registrations/conference", walk_in).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_signed_webhook(app, &paid_event(&reference, 300_000), WEBHOOK_SECRET).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], "already_registered");
    assert_eq!(count(&pool, "conferences").await, 1);
    assert_eq!(count(&pool, "pending_checkouts").await, 0);

    let status: String = sqlx::query_scalar("SELECT payment_status FROM conferences")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "PENDING");
}

#[sqlx::test(migrations = "./migrations")]
async fn callback_that_is_not_a_payment_is_ignored(pool: PgPool) {
    let day1 = seed_event(&pool, "Conference Day 1", 300_000, "CONFERENCE").await;
    let (app, _) = common::build_test_app(pool.clone());

    let reference = open_checkout(app.clone(), "online@example.com", day1).await;
    let event = checkout_event("payment.failed", &reference, 300_000);

    let response = post_signed_webhook(app, &event, WEBHOOK_SECRET).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], "ignored");
    assert_eq!(count(&pool, "conferences").await, 0);
    assert_eq!(count(&pool, "pending_checkouts").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn only_expired_checkouts_are_purged(pool: PgPool) {
    for (email, expires_in_minutes) in [("old@example.com", -5), ("open@example.com", 60)] {
        sqlx::query(
            r#"
            INSERT INTO pending_checkouts (reference, email, payload, amount_cents, expires_at)
            VALUES ($1, $2, '{}'::jsonb, 300000, NOW() + make_interval(mins => $3))
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(expires_in_minutes)
        .execute(&pool)
        .await
        .unwrap();
    }

    let purged = registration_service::purge_expired_checkouts(&pool).await.unwrap();

    assert_eq!(purged, 1);
    let left: String = sqlx::query_scalar("SELECT email FROM pending_checkouts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(left, "open@example.com");
}
