//! Port interfaces for sync operations

use std::time::Duration;

use async_trait::async_trait;
use duesync_domain::{
    AccessToken, AccountRole, Assignment, EventMapping, EventSpec, Result, SyncContext,
    SyncErrorKind, SyncSettings,
};
use thiserror::Error;

/// Source of cached, deduplicated assignments
#[async_trait]
pub trait AssignmentSource: Send + Sync {
    /// Every cached assignment for the student, in no particular order
    async fn fetch_assignments(&self, student_id: &str) -> Result<Vec<Assignment>>;
}

/// Persistence for per-student sync preferences
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Stored settings, or `None` when the defaults apply
    async fn get_settings(&self, ctx: &SyncContext) -> Result<Option<SyncSettings>>;

    /// Insert or replace by (user, student)
    async fn save_settings(&self, settings: &SyncSettings) -> Result<()>;

    /// Pairs with both `sync_enabled` and `auto_sync_enabled` set
    async fn list_auto_sync_targets(&self) -> Result<Vec<SyncContext>>;
}

/// Persistence for assignment to event mappings
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Mappings recorded for one role of the student
    async fn list_mappings(&self, student_id: &str, role: AccountRole) -> Result<Vec<EventMapping>>;

    /// Insert or replace by (assignment, student, role)
    async fn upsert_mapping(&self, mapping: &EventMapping) -> Result<()>;

    /// Returns whether a row was removed
    async fn delete_mapping(
        &self,
        assignment_id: &str,
        student_id: &str,
        role: AccountRole,
    ) -> Result<bool>;

    /// Remove every mapping of the role; returns the number removed
    async fn delete_role_mappings(&self, student_id: &str, role: AccountRole) -> Result<usize>;
}

/// Failure reported by the calendar provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("rate limited (retry after {0:?})")]
    RateLimited(Option<Duration>),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("rejected: {0}")]
    Permanent(String),
}

impl GatewayError {
    /// User-visible category of this failure.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::RateLimited(_) => SyncErrorKind::RateLimited,
            Self::Unauthorized => SyncErrorKind::AuthorizationExpired,
            Self::Transient(_) => SyncErrorKind::TransientNetwork,
            Self::NotFound | Self::Permanent(_) => SyncErrorKind::PermanentRejection,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Remote calendar provider
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Create a secondary calendar and return its id
    async fn ensure_calendar(&self, token: &AccessToken, display_name: &str)
        -> GatewayResult<String>;

    /// Create an event and return its provider id
    async fn create_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        spec: &EventSpec,
    ) -> GatewayResult<String>;

    /// Replace an event's content in place
    async fn update_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
        spec: &EventSpec,
    ) -> GatewayResult<()>;

    /// Delete an event; an already-deleted event is success
    async fn delete_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
    ) -> GatewayResult<()>;
}
