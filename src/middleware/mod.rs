//! HTTP middleware components.

/// API key authentication for admin routes
pub mod auth;
