//! Assignment to calendar-event mappings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::AccountRole;

/// Hex digest of the event content last written to the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// "This assignment, for this student and role, became this event."
///
/// Identity is `(assignment_id, student_id, role)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMapping {
    pub assignment_id: String,
    pub student_id: String,
    pub role: AccountRole,
    pub external_event_id: String,
    pub external_calendar_id: String,
    pub last_synced_at: DateTime<Utc>,
    pub content_fingerprint: ContentFingerprint,
}
