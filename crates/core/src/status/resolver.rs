use chrono::{DateTime, Utc};
use duesync_domain::{Assignment, Status};

/// Computes an assignment's status from its flags and due date.
///
/// Rules are evaluated in order and the first match wins:
/// 1. submitted and graded: `Submitted`
/// 2. missing: `Missing`
/// 3. late: `Late`
/// 4. past due, not submitted, and not (graded with a score): `Overdue`
/// 5. otherwise `Pending`
///
/// Rule 4 only suppresses `Overdue` when the assignment is graded *and* has
/// a score, so a graded-but-scoreless unsubmitted assignment is `Overdue`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusResolver;

impl StatusResolver {
    pub fn resolve(assignment: &Assignment, now: DateTime<Utc>) -> Status {
        if assignment.submitted && assignment.graded {
            return Status::Submitted;
        }
        if assignment.missing {
            return Status::Missing;
        }
        if assignment.late {
            return Status::Late;
        }

        let past_due = assignment.due_at.is_some_and(|due| due < now);
        let graded_with_score = assignment.graded && assignment.current_grade.is_some();
        if past_due && !assignment.submitted && !graded_with_score {
            return Status::Overdue;
        }

        Status::Pending
    }
}
