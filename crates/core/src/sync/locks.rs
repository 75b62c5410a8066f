//! Per-student mutual exclusion for sync passes

use std::sync::Arc;

use dashmap::DashMap;
use duesync_domain::{DueSyncError, Result};

/// Registry of students with a pass in flight.
///
/// Acquisition never waits: a second request for the same student is
/// rejected with `SyncInProgress`.
#[derive(Debug, Clone, Default)]
pub struct StudentLocks {
    active: Arc<DashMap<String, ()>>,
}

impl StudentLocks {
    /// An empty registry; no student is held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the student or fail with `SyncInProgress`.
    pub fn try_acquire(&self, student_id: &str) -> Result<StudentLockGuard> {
        match self.active.entry(student_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(DueSyncError::SyncInProgress(student_id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(StudentLockGuard { active: Arc::clone(&self.active), student_id: student_id.to_string() })
            }
        }
    }

    /// Whether a pass or disconnect currently holds the student.
    pub fn is_locked(&self, student_id: &str) -> bool {
        self.active.contains_key(student_id)
    }
}

/// Releases the student when dropped.
#[derive(Debug)]
pub struct StudentLockGuard {
    active: Arc<DashMap<String, ()>>,
    student_id: String,
}

impl Drop for StudentLockGuard {
    fn drop(&mut self) {
        self.active.remove(&self.student_id);
    }
}
