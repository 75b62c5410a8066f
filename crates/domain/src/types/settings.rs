//! Per-student sync preferences

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::assignment::AssignmentType;
use super::role::AccountRole;

/// Sync preferences for one (user, student) pair.
///
/// A missing row means [`SyncSettings::defaults`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub user_id: String,
    pub student_id: String,
    pub sync_enabled: bool,
    pub sync_to_parent: bool,
    pub sync_to_student: bool,
    /// Minutes before due, descending by convention; empty means none
    pub parent_reminders: Vec<u32>,
    pub student_reminders: Vec<u32>,
    /// Empty means every course
    pub included_courses: BTreeSet<String>,
    pub excluded_types: BTreeSet<AssignmentType>,
    pub sync_completed_assignments: bool,
    pub auto_sync_enabled: bool,
}

impl SyncSettings {
    pub fn defaults(user_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            student_id: student_id.into(),
            sync_enabled: true,
            sync_to_parent: true,
            sync_to_student: true,
            parent_reminders: AccountRole::Parent.profile().default_reminders.to_vec(),
            student_reminders: AccountRole::Student.profile().default_reminders.to_vec(),
            included_courses: BTreeSet::new(),
            excluded_types: BTreeSet::new(),
            sync_completed_assignments: false,
            auto_sync_enabled: true,
        }
    }

    /// Whether the course passes the allowlist.
    pub fn includes_course(&self, course_id: &str) -> bool {
        self.included_courses.is_empty() || self.included_courses.contains(course_id)
    }
}
