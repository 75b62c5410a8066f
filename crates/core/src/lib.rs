//! # DueSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The assignment status resolver
//! - The OAuth token lifecycle manager
//! - The sync reconciler and its retry policy
//! - Port interfaces (traits) for storage, tokens and the calendar provider
//!
//! ## Architecture Principles
//! - Only depends on `duesync-common` and `duesync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod status;
pub mod sync;
pub mod tokens;

pub use status::StatusResolver;
pub use sync::ports::{
    AssignmentSource, CalendarGateway, GatewayError, GatewayResult, MappingRepository,
    SettingsRepository,
};
pub use sync::{
    ReconcilerOptions, RetryDecision, RetryPolicy, RoleDisconnect, StudentLocks, SyncReconciler,
};
pub use tokens::ports::{RefreshError, RefreshedToken, TokenCipher, TokenRefresher, TokenRepository};
pub use tokens::TokenLifecycleManager;
