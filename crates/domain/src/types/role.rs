//! Account roles and their per-role configuration table

use serde::{Deserialize, Serialize};

use super::settings::SyncSettings;
use crate::impl_domain_status_conversions;

/// Which calendar owner a record belongs to. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Parent,
    Student,
}

impl_domain_status_conversions!(AccountRole {
    Parent => "parent",
    Student => "student",
});

impl AccountRole {
    /// Every role, in processing order.
    pub const ALL: [Self; 2] = [Self::Parent, Self::Student];

    /// Static configuration for this role.
    pub fn profile(self) -> &'static RoleProfile {
        match self {
            Self::Parent => &PARENT_PROFILE,
            Self::Student => &STUDENT_PROFILE,
        }
    }
}

/// Role-specific defaults and settings accessors.
///
/// All per-role branching goes through this table so the reconciler itself
/// never matches on `AccountRole`.
pub struct RoleProfile {
    pub role: AccountRole,
    pub calendar_name: &'static str,
    pub default_reminders: &'static [u32],
    enabled: fn(&SyncSettings) -> bool,
    reminders: fn(&SyncSettings) -> &[u32],
}

impl std::fmt::Debug for RoleProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleProfile")
            .field("role", &self.role)
            .field("calendar_name", &self.calendar_name)
            .field("default_reminders", &self.default_reminders)
            .finish_non_exhaustive()
    }
}

impl RoleProfile {
    /// Whether this role's sync flag is on (ignores the global switch).
    pub fn is_enabled(&self, settings: &SyncSettings) -> bool {
        (self.enabled)(settings)
    }

    /// Configured reminder offsets, minutes before due.
    pub fn reminders<'a>(&self, settings: &'a SyncSettings) -> &'a [u32] {
        (self.reminders)(settings)
    }
}

static PARENT_PROFILE: RoleProfile = RoleProfile {
    role: AccountRole::Parent,
    calendar_name: "School Assignments (Parent)",
    default_reminders: &[1440, 120],
    enabled: parent_enabled,
    reminders: parent_reminders,
};

static STUDENT_PROFILE: RoleProfile = RoleProfile {
    role: AccountRole::Student,
    calendar_name: "School Assignments",
    default_reminders: &[120, 30],
    enabled: student_enabled,
    reminders: student_reminders,
};

fn parent_enabled(s: &SyncSettings) -> bool {
    s.sync_to_parent
}

fn parent_reminders(s: &SyncSettings) -> &[u32] {
    &s.parent_reminders
}

fn student_enabled(s: &SyncSettings) -> bool {
    s.sync_to_student
}

fn student_reminders(s: &SyncSettings) -> &[u32] {
    &s.student_reminders
}
