//! Payment gateway callback handler.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;

use crate::{
    error::AppError,
    services::{
        payment_gateway::{self, SIGNATURE_HEADER, WebhookEvent},
        registration_service::{self, CheckoutConfirmation},
    },
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub result: CheckoutConfirmation,
}

/// Receive a gateway event.
///
/// # Endpoint
///
/// `POST /api/v1/payments/webhook`
///
/// # Security
///
/// The raw body is verified against the `Paymongo-Signature` header before it
/// is parsed. Without a configured webhook secret every callback is refused.
///
/// # Response
///
/// 200 for every authentic event, including ones that are ignored or refer
/// to an unknown reference, so the gateway stops redelivering them.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let Some(secret) = state.config.paymongo_webhook_secret.as_deref() else {
        tracing::warn!("Payment webhook received but PAYMONGO_WEBHOOK_SECRET is not set");
        return Err(AppError::InvalidSignature);
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    payment_gateway::verify_signature(secret, signature, &body)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed webhook payload: {}", e)))?;

    tracing::info!(
        event_id = %event.data.id,
        event_type = %event.data.attributes.event_type,
        livemode = event.data.attributes.livemode,
        "Payment webhook received"
    );

    let result = registration_service::confirm_checkout(&state.pool, &event).await?;

    Ok(Json(WebhookAck {
        received: true,
        result,
    }))
}
