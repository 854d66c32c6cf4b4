//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to a service
//! 3. Returns HTTP response (JSON, status code)

/// Back-office registrant, visitor and exhibitor tables
pub mod admin;
pub mod codes;
pub mod drafts;
/// Event catalog
pub mod events;
pub mod health;
/// Payment gateway callbacks
pub mod payments;
/// Public registration forms
pub mod registrations;
