//! Payment gateway client and webhook verification.
//!
//! Online conference payments go through a hosted checkout page. This module
//! creates those checkout sessions and authenticates the callbacks the
//! gateway sends once a session is paid.
//!
//! # Signature Format
//!
//! Callbacks carry a `Paymongo-Signature` header:
//!
//! ```text
//! Paymongo-Signature: t=1496734173,te=<hex>,li=<hex>
//! ```
//!
//! `te` is set for test-mode events and `li` for live-mode events. Each is
//! HMAC-SHA256(webhook_secret, "{t}.{raw_body}") in hex.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Header name the gateway signs callbacks with.
pub const SIGNATURE_HEADER: &str = "Paymongo-Signature";

/// Event type emitted when a checkout session has been paid.
pub const CHECKOUT_PAID_EVENT: &str = "checkout_session.payment.paid";

pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

/// Everything the gateway needs to render a hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Our reference, echoed back in the paid webhook
    pub reference: Uuid,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    pub fn amount_cents(&self) -> i64 {
        self.line_items
            .iter()
            .map(|item| item.amount_cents * i64::from(item.quantity))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    /// Unit price in centavos
    pub amount_cents: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub checkout_url: String,
}

/// Payment gateway abstraction.
///
/// The production implementation talks to PayMongo; tests and local
/// development use [`MockPaymentGateway`].
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// `AppError::Gateway` when the provider rejects the request or cannot be
    /// reached.
    fn create_checkout_session(&self, request: CheckoutRequest) -> GatewayFuture<'_, CheckoutSession>;
}

/// PayMongo checkout-session client.
#[derive(Debug, Clone)]
pub struct PayMongoGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl PayMongoGateway {
    /// Build a client with a 10 second timeout per call.
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Gateway(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    fn request_body(request: &CheckoutRequest) -> serde_json::Value {
        let line_items: Vec<serde_json::Value> = request
            .line_items
            .iter()
            .map(|item| {
                json!({
                    "currency": request.currency,
                    "amount": item.amount_cents,
                    "name": item.name,
                    "quantity": item.quantity,
                })
            })
            .collect();

        json!({
            "data": {
                "attributes": {
                    "billing": {
                        "name": request.customer_name,
                        "email": request.customer_email,
                        "phone": request.customer_phone,
                    },
                    "line_items": line_items,
                    "payment_method_types": ["card", "gcash", "paymaya", "grab_pay"],
                    "reference_number": request.reference.to_string(),
                    "description": request.description,
                    "success_url": request.success_url,
                    "cancel_url": request.cancel_url,
                    "send_email_receipt": true,
                    "metadata": { "reference": request.reference.to_string() },
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    data: SessionResource,
}

#[derive(Debug, Deserialize)]
struct SessionResource {
    id: String,
    attributes: SessionAttributes,
}

#[derive(Debug, Deserialize)]
struct SessionAttributes {
    checkout_url: String,
}

impl PaymentGateway for PayMongoGateway {
    fn create_checkout_session(&self, request: CheckoutRequest) -> GatewayFuture<'_, CheckoutSession> {
        Box::pin(async move {
            let body = Self::request_body(&request);

            let response = self
                .client
                .post(format!("{}/checkout_sessions", self.api_base))
                .basic_auth(&self.secret_key, Some(""))
                .json(&body)
                .send()
                .await
                .map_err(|e| AppError::Gateway(format!("Request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(AppError::Gateway(format!(
                    "Checkout session rejected with {}: {}",
                    status, detail
                )));
            }

            let envelope: SessionEnvelope = response
                .json()
                .await
                .map_err(|e| AppError::Gateway(format!("Unexpected response: {}", e)))?;

            tracing::info!(
                reference = %request.reference,
                session_id = %envelope.data.id,
                amount_cents = request.amount_cents(),
                "Checkout session created"
            );

            Ok(CheckoutSession {
                id: envelope.data.id,
                checkout_url: envelope.data.attributes.checkout_url,
            })
        })
    }
}

/// In-process gateway for development and tests.
///
/// Every session succeeds unless built with [`MockPaymentGateway::failing`].
/// Only a gateway built with [`MockPaymentGateway::recording`] keeps the
/// requests it receives.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    fail: bool,
    record: bool,
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps every request so tests can inspect what would have been sent.
    pub fn recording() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    /// A gateway whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Requests received so far, oldest first. Always empty unless recording.
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn create_checkout_session(&self, request: CheckoutRequest) -> GatewayFuture<'_, CheckoutSession> {
        Box::pin(async move {
            if self.fail {
                return Err(AppError::Gateway("mock gateway configured to fail".to_string()));
            }

            let session = CheckoutSession {
                id: format!("cs_mock_{}", request.reference.simple()),
                checkout_url: format!("https://checkout.example.test/{}", request.reference),
            };

            tracing::info!(
                reference = %request.reference,
                amount_cents = request.amount_cents(),
                "Mock checkout session created"
            );

            if self.record {
                if let Ok(mut requests) = self.requests.lock() {
                    requests.push(request);
                }
            }

            Ok(session)
        })
    }
}

/// Gateway callback envelope.
///
/// # Example
///
/// ```json
/// {
///   "data": {
///     "id": "evt_9f1...",
///     "attributes": {
///       "type": "checkout_session.payment.paid",
///       "livemode": false,
///       "data": {
///         "id": "cs_1a2...",
///         "attributes": {
///           "reference_number": "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
///           "payments": [ { "id": "pay_...", "attributes": { "amount": 600000 } } ]
///         }
///       }
///     }
///   }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub data: WebhookEventData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub id: String,
    pub attributes: WebhookEventAttributes,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookEventAttributes {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub livemode: bool,
    pub data: CheckoutSessionResource,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSessionResource {
    pub id: String,
    pub attributes: CheckoutSessionAttributes,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSessionAttributes {
    pub reference_number: Option<String>,
    #[serde(default)]
    pub payments: Vec<PaymentResource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResource {
    pub id: String,
    pub attributes: PaymentAttributes,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentAttributes {
    pub amount: i64,
}

impl WebhookEvent {
    pub fn reference(&self) -> Option<Uuid> {
        self.data
            .attributes
            .data
            .attributes
            .reference_number
            .as_deref()
            .and_then(|reference| Uuid::parse_str(reference).ok())
    }

    /// Sum of the payments attached to the session, in centavos.
    pub fn amount_paid_cents(&self) -> i64 {
        self.data
            .attributes
            .data
            .attributes
            .payments
            .iter()
            .map(|payment| payment.attributes.amount)
            .sum()
    }
}

/// Verify a callback signature header against the raw request body.
///
/// # Errors
///
/// `InvalidSignature` when the header is malformed or neither the test nor
/// the live signature matches.
pub fn verify_signature(secret: &str, header: &str, body: &[u8]) -> Result<(), AppError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("te", value)) | Some(("li", value)) if !value.is_empty() => {
                candidates.push(value)
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;

    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::InvalidSignature)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);

        // verify_slice compares in constant time
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::InvalidSignature)
}

/// Produce a test-mode signature header for `body`.
///
/// Mirrors what the gateway sends; used by tests and local tooling.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={},te={},li=", timestamp, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "whsk_test_secret";

    fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            reference: Uuid::new_v4(),
            currency: "PHP".to_string(),
            line_items: vec![
                LineItem {
                    name: "Day 1".to_string(),
                    amount_cents: 300_000,
                    quantity: 1,
                },
                LineItem {
                    name: "Workshop".to_string(),
                    amount_cents: 80_000,
                    quantity: 2,
                },
            ],
            description: "Conference registration".to_string(),
            customer_name: "Maria Santos".to_string(),
            customer_email: "maria@example.com".to_string(),
            customer_phone: "09171234567".to_string(),
            success_url: "http://localhost:3000/register/success".to_string(),
            cancel_url: "http://localhost:3000/register/cancelled".to_string(),
        }
    }

    #[test]
    fn signed_payload_verifies() {
        let body = br#"{"data":{}}"#;
        let header = sign_payload(SECRET, 1_700_000_000, body);

        assert!(verify_signature(SECRET, &header, body).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign_payload(SECRET, 1_700_000_000, br#"{"amount":100}"#);

        let result = verify_signature(SECRET, &header, br#"{"amount":999}"#);

        assert_matches!(result, Err(AppError::InvalidSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"{}";
        let header = sign_payload("another_secret", 1_700_000_000, body);

        assert_matches!(
            verify_signature(SECRET, &header, body),
            Err(AppError::InvalidSignature)
        );
    }

    #[test]
    fn header_without_timestamp_is_rejected() {
        assert_matches!(
            verify_signature(SECRET, "te=abcdef", b"{}"),
            Err(AppError::InvalidSignature)
        );
    }

    #[test]
    fn live_signature_is_accepted() {
        let body = b"{}";
        let test_header = sign_payload(SECRET, 42, body);
        let signature = test_header
            .split(',')
            .find_map(|part| part.strip_prefix("te="))
            .unwrap();
        let live_header = format!("t=42,te=,li={}", signature);

        assert!(verify_signature(SECRET, &live_header, body).is_ok());
    }

    #[test]
    fn request_body_lists_items_in_minor_units() {
        let request = checkout_request();

        let body = PayMongoGateway::request_body(&request);
        let attributes = &body["data"]["attributes"];

        assert_eq!(attributes["line_items"][0]["amount"], 300_000);
        assert_eq!(attributes["line_items"][1]["quantity"], 2);
        assert_eq!(attributes["reference_number"], request.reference.to_string());
        assert_eq!(attributes["billing"]["email"], "maria@example.com");
        assert_eq!(request.amount_cents(), 460_000);
    }

    #[test]
    fn webhook_event_exposes_reference_and_amount() {
        let reference = Uuid::new_v4();
        let event: WebhookEvent = serde_json::from_value(json!({
            "data": {
                "id": "evt_1",
                "attributes": {
                    "type": CHECKOUT_PAID_EVENT,
                    "livemode": false,
                    "data": {
                        "id": "cs_1",
                        "attributes": {
                            "reference_number": reference.to_string(),
                            "payments": [
                                { "id": "pay_1", "attributes": { "amount": 600000 } }
                            ]
                        }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(event.reference(), Some(reference));
        assert_eq!(event.amount_paid_cents(), 600_000);
    }

    #[tokio::test]
    async fn recording_mock_gateway_keeps_requests() {
        let gateway = MockPaymentGateway::recording();
        let request = checkout_request();
        let reference = request.reference;

        let session = gateway.create_checkout_session(request).await.unwrap();

        assert!(session.checkout_url.ends_with(&reference.to_string()));
        assert_eq!(gateway.requests().len(), 1);
    }

    #[tokio::test]
    async fn default_mock_gateway_keeps_nothing() {
        let gateway = MockPaymentGateway::new();

        gateway.create_checkout_session(checkout_request()).await.unwrap();
        gateway.create_checkout_session(checkout_request()).await.unwrap();

        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn failing_mock_gateway_returns_gateway_error() {
        let gateway = MockPaymentGateway::failing();

        let result = gateway.create_checkout_session(checkout_request()).await;

        assert_matches!(result, Err(AppError::Gateway(_)));
    }
}
