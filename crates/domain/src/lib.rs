//! # DueSync Domain
//!
//! Business domain types for DueSync.
//!
//! This crate contains:
//! - Assignment, settings, token and mapping models
//! - The `AccountRole` lookup table (`RoleProfile`)
//! - Event content derivation and content fingerprints
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other DueSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::assignment_type::infer_assignment_type;
