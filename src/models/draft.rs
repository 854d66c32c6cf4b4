//! Server-side form drafts.
//!
//! The registration forms auto-save unsubmitted state so a visitor can leave
//! and come back. A draft is addressed by form kind plus a client-chosen key
//! and carries a version number for optimistic concurrency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FormDraft {
    pub id: Uuid,
    pub form_kind: String,
    pub draft_key: String,
    pub data: serde_json::Value,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

/// Which registration form a draft belongs to (lower-case in URLs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Visitor,
    Exhibitor,
    Conference,
}

impl FormKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FormKind::Visitor => "VISITOR",
            FormKind::Exhibitor => "EXHIBITOR",
            FormKind::Conference => "CONFERENCE",
        }
    }
}

/// Request body for `PUT /api/v1/drafts/{kind}/{key}`.
///
/// `expected_version` is the version the client last loaded. Omit it to
/// create a draft or to overwrite unconditionally.
#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    pub data: serde_json::Value,
    pub expected_version: Option<i32>,
}
