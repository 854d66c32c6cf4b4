//! Data models representing database entities and API payloads.

/// Admin API key model
pub mod api_key;
pub mod checkout;
/// Membership code distribution
pub mod code;
/// Conference registrations, payments and quotes
pub mod conference;
pub mod draft;
/// Event catalog
pub mod event;
pub mod exhibitor;
/// Pagination and sorting for admin tables
pub mod listing;
/// Users, accounts and personal details
pub mod user;
pub mod visitor;
