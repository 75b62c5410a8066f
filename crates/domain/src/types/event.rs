//! Calendar event content derived from an assignment

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::assignment::Assignment;
use super::mapping::ContentFingerprint;
use crate::constants::{
    EVENT_WINDOW_MINUTES, EXT_PROP_ASSIGNMENT_ID, EXT_PROP_COURSE_ID, EXT_PROP_POINTS_POSSIBLE,
};

/// Provider-neutral description of one calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Popup reminders, minutes before `end`
    pub reminders: Vec<u32>,
    /// Private properties that let mappings be rebuilt from the calendar
    pub extended_properties: BTreeMap<String, String>,
}

impl EventSpec {
    /// Build the event for an assignment. `None` when it has no due date.
    ///
    /// The window is the hour ending at the due time.
    pub fn for_assignment(assignment: &Assignment, reminders: &[u32]) -> Option<Self> {
        let due_at = assignment.due_at?;

        let mut description = assignment.course_name.clone();
        if let Some(points) = assignment.points_possible {
            description.push_str(&format!("\nPoints possible: {points}"));
        }
        if let Some(grade) = assignment.current_grade {
            description.push_str(&format!("\nCurrent grade: {grade}"));
        }

        let mut extended_properties = BTreeMap::new();
        extended_properties.insert(EXT_PROP_ASSIGNMENT_ID.to_string(), assignment.plannable_id.clone());
        extended_properties.insert(EXT_PROP_COURSE_ID.to_string(), assignment.course_id.clone());
        if let Some(points) = assignment.points_possible {
            extended_properties.insert(EXT_PROP_POINTS_POSSIBLE.to_string(), points.to_string());
        }

        Some(Self {
            summary: assignment.title.clone(),
            description,
            start: due_at - Duration::minutes(EVENT_WINDOW_MINUTES),
            end: due_at,
            reminders: reminders.to_vec(),
            extended_properties,
        })
    }

    /// Fingerprint of everything this spec would write to the calendar.
    pub fn fingerprint(&self) -> ContentFingerprint {
        let mut hasher = blake3::Hasher::new();
        put(&mut hasher, self.summary.as_bytes());
        put(&mut hasher, self.description.as_bytes());
        put(&mut hasher, &self.start.timestamp().to_le_bytes());
        put(&mut hasher, &self.end.timestamp().to_le_bytes());
        hasher.update(&(self.reminders.len() as u64).to_le_bytes());
        for minutes in &self.reminders {
            hasher.update(&minutes.to_le_bytes());
        }
        for (key, value) in &self.extended_properties {
            put(&mut hasher, key.as_bytes());
            put(&mut hasher, value.as_bytes());
        }
        ContentFingerprint::from_hex(hasher.finalize().to_hex().to_string())
    }
}

// Length-prefixed so adjacent fields cannot run together.
fn put(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
