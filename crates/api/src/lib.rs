//! # DueSync API
//!
//! Application layer - commands and main entry point.
//!
//! This crate contains:
//! - Commands (UI → backend bridge)
//! - Application context (dependency injection)
//! - The OAuth connect service
//! - Logging setup and the `duesync` binary
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod services;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
