//! Filtering and diffing for one role

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use duesync_domain::{
    AccountRole, Assignment, ContentFingerprint, EventMapping, EventSpec, SyncSettings,
};

use crate::status::StatusResolver;

/// Event content for one eligible assignment.
#[derive(Debug, Clone)]
pub struct PlannedEvent {
    pub assignment_id: String,
    pub spec: EventSpec,
    pub fingerprint: ContentFingerprint,
}

/// Calendar operations needed to bring one role up to date.
#[derive(Debug, Default)]
pub struct RolePlan {
    pub to_create: Vec<PlannedEvent>,
    pub to_update: Vec<(EventMapping, PlannedEvent)>,
    pub to_delete: Vec<EventMapping>,
    /// Mapped events whose fingerprint still matches
    pub unchanged: usize,
}

impl RolePlan {
    /// Creates or updates need a target calendar; deletes use the mapping's.
    pub fn needs_calendar(&self) -> bool {
        !self.to_create.is_empty() || !self.to_update.is_empty()
    }
}

/// Whether an assignment should have an event for `role`.
///
/// Undated assignments have no time window and are never eligible.
pub fn is_eligible(
    assignment: &Assignment,
    settings: &SyncSettings,
    role: AccountRole,
    now: DateTime<Utc>,
) -> bool {
    if !settings.sync_enabled || !role.profile().is_enabled(settings) {
        return false;
    }
    if assignment.due_at.is_none() {
        return false;
    }
    if !settings.includes_course(&assignment.course_id) {
        return false;
    }
    if settings.excluded_types.contains(&assignment.assignment_type()) {
        return false;
    }
    if !settings.sync_completed_assignments
        && StatusResolver::resolve(assignment, now).is_completed()
    {
        return false;
    }
    true
}

/// Build the event for every eligible assignment.
pub fn planned_events(
    assignments: &[Assignment],
    settings: &SyncSettings,
    role: AccountRole,
    now: DateTime<Utc>,
) -> Vec<PlannedEvent> {
    let reminders = role.profile().reminders(settings);
    assignments
        .iter()
        .filter(|a| is_eligible(a, settings, role, now))
        .filter_map(|a| {
            EventSpec::for_assignment(a, reminders).map(|spec| PlannedEvent {
                assignment_id: a.plannable_id.clone(),
                fingerprint: spec.fingerprint(),
                spec,
            })
        })
        .collect()
}

/// Partition eligible events against existing mappings.
///
/// Mappings whose assignment is no longer eligible are deleted. Updates are
/// detected by content fingerprint, never by timestamps.
pub fn diff(eligible: Vec<PlannedEvent>, mappings: Vec<EventMapping>) -> RolePlan {
    let mut by_assignment: HashMap<String, EventMapping> =
        mappings.into_iter().map(|m| (m.assignment_id.clone(), m)).collect();
    let mut plan = RolePlan::default();

    for event in eligible {
        match by_assignment.remove(&event.assignment_id) {
            None => plan.to_create.push(event),
            Some(mapping) if mapping.content_fingerprint != event.fingerprint => {
                plan.to_update.push((mapping, event));
            }
            Some(_) => plan.unchanged += 1,
        }
    }

    plan.to_delete = by_assignment.into_values().collect();
    plan.to_delete.sort_by(|a, b| a.assignment_id.cmp(&b.assignment_id));
    plan
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use duesync_domain::AssignmentType;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
    }

    fn assignment(id: &str) -> Assignment {
        Assignment {
            student_id: "s1".into(),
            plannable_id: id.into(),
            title: format!("Homework {id}"),
            course_id: "c1".into(),
            course_name: "Math".into(),
            due_at: Some(now() + Duration::days(2)),
            points_possible: Some(10.0),
            current_grade: None,
            submitted: false,
            missing: false,
            late: false,
            graded: false,
        }
    }

    fn mapping_for(event: &PlannedEvent) -> EventMapping {
        EventMapping {
            assignment_id: event.assignment_id.clone(),
            student_id: "s1".into(),
            role: AccountRole::Parent,
            external_event_id: format!("evt-{}", event.assignment_id),
            external_calendar_id: "cal".into(),
            last_synced_at: now(),
            content_fingerprint: event.fingerprint.clone(),
        }
    }

    #[test]
    fn completed_assignments_are_filtered_unless_opted_in() {
        let settings = SyncSettings::defaults("u1", "s1");
        let done = Assignment { submitted: true, graded: true, ..assignment("a1") };

        assert!(!is_eligible(&done, &settings, AccountRole::Parent, now()));

        let opted_in = SyncSettings { sync_completed_assignments: true, ..settings };
        assert!(is_eligible(&done, &opted_in, AccountRole::Parent, now()));
    }

    #[test]
    fn course_allowlist_and_type_exclusion_apply() {
        let mut settings = SyncSettings::defaults("u1", "s1");
        settings.included_courses.insert("c2".into());
        assert!(!is_eligible(&assignment("a1"), &settings, AccountRole::Student, now()));

        let mut settings = SyncSettings::defaults("u1", "s1");
        settings.excluded_types.insert(AssignmentType::Homework);
        assert!(!is_eligible(&assignment("a1"), &settings, AccountRole::Student, now()));
    }

    #[test]
    fn undated_and_disabled_role_are_ineligible() {
        let settings = SyncSettings::defaults("u1", "s1");
        let undated = Assignment { due_at: None, ..assignment("a1") };
        assert!(!is_eligible(&undated, &settings, AccountRole::Parent, now()));

        let parent_off = SyncSettings { sync_to_parent: false, ..settings };
        assert!(!is_eligible(&assignment("a1"), &parent_off, AccountRole::Parent, now()));
        assert!(is_eligible(&assignment("a1"), &parent_off, AccountRole::Student, now()));
    }

    #[test]
    fn diff_partitions_by_fingerprint() {
        let settings = SyncSettings::defaults("u1", "s1");
        let now = now();
        let original = planned_events(&[assignment("a1"), assignment("a2")], &settings, AccountRole::Parent, now);
        let mappings: Vec<_> = original.iter().map(mapping_for).collect();

        let moved = Assignment { due_at: Some(now + Duration::days(3)), ..assignment("a2") };
        let eligible =
            planned_events(&[assignment("a1"), moved, assignment("a3")], &settings, AccountRole::Parent, now);

        let plan = diff(eligible, mappings);
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].0.assignment_id, "a2");
        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_create[0].assignment_id, "a3");
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn mappings_without_eligible_assignment_are_deleted() {
        let settings = SyncSettings::defaults("u1", "s1");
        let events = planned_events(&[assignment("a1")], &settings, AccountRole::Parent, now());
        let mappings: Vec<_> = events.iter().map(mapping_for).collect();

        let plan = diff(Vec::new(), mappings);
        assert_eq!(plan.to_delete.len(), 1);
        assert!(!plan.needs_calendar());
    }
}
