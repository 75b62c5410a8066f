//! # DueSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Database implementations (SQLCipher) for tokens, settings, mappings and
//!   the assignment cache
//! - The Google Calendar gateway and OAuth token refresher
//! - Token encryption and database key management
//! - Configuration loading and the auto-sync scheduler
//!
//! ## Architecture
//! - Implements traits defined in `duesync-core`
//! - Contains all "impure" code (I/O, keychain, HTTP)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod key_manager;
pub mod scheduling;
pub mod security;

// Re-export commonly used items
pub use database::*;
pub use errors::InfraError;
pub use integrations::google::{GoogleCalendarGateway, GoogleTokenRefresher};
pub use key_manager::KeyManager;
pub use scheduling::{AutoSyncScheduler, AutoSyncSchedulerConfig, AutoSyncSummary, SchedulerError};
pub use security::AesTokenCipher;
