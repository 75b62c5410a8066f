//! Domain types and models

pub mod assignment;
pub mod event;
pub mod mapping;
pub mod role;
pub mod settings;
pub mod sync;
pub mod token;

use serde::{Deserialize, Serialize};

pub use assignment::{Assignment, AssignmentType, Status};
pub use event::EventSpec;
pub use mapping::{ContentFingerprint, EventMapping};
pub use role::{AccountRole, RoleProfile};
pub use settings::SyncSettings;
pub use sync::{ItemError, PassState, RoleOutcome, RoleSummary, SyncErrorKind, SyncResult};
pub use token::{AccessToken, ConnectionStatus, TokenGrant, TokenRecord, TokenStatus, ValidToken};

/// Identity of one observer/student pairing.
///
/// Passed explicitly to every reconciler and token call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncContext {
    pub user_id: String,
    pub student_id: String,
}

impl SyncContext {
    pub fn new(user_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), student_id: student_id.into() }
    }
}
