//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and gateway calls.

pub mod admin_service;
pub mod api_key_service;
pub mod code_service;
pub mod draft_service;
pub mod event_service;
pub mod payment_gateway;
pub mod pricing;
pub mod registration_service;
