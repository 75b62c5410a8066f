//! Cached LMS assignments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;
use crate::utils::assignment_type::infer_assignment_type;

/// An assignment as cached from the LMS. Identity is
/// `(student_id, plannable_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub student_id: String,
    pub plannable_id: String,
    pub title: String,
    pub course_id: String,
    pub course_name: String,
    pub due_at: Option<DateTime<Utc>>,
    pub points_possible: Option<f64>,
    /// Current score, if the LMS reports one
    pub current_grade: Option<f64>,
    pub submitted: bool,
    pub missing: bool,
    pub late: bool,
    pub graded: bool,
}

impl Assignment {
    /// Keyword-inferred category of this assignment.
    pub fn assignment_type(&self) -> AssignmentType {
        infer_assignment_type(&self.title)
    }
}

/// Display/sync status derived from submission flags and due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Submitted,
    Missing,
    Late,
    Overdue,
    Pending,
}

impl_domain_status_conversions!(Status {
    Submitted => "submitted",
    Missing => "missing",
    Late => "late",
    Overdue => "overdue",
    Pending => "pending",
});

impl Status {
    /// `Submitted` is what the sync filter treats as completed.
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// Coarse assignment category used by the excluded-type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentType {
    Quiz,
    Test,
    Project,
    Lab,
    Homework,
    Discussion,
    Reading,
    Other,
}

impl_domain_status_conversions!(AssignmentType {
    Quiz => "quiz",
    Test => "test",
    Project => "project",
    Lab => "lab",
    Homework => "homework",
    Discussion => "discussion",
    Reading => "reading",
    Other => "other",
});
