//! Shared building blocks for the DueSync crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: shared error type, privacy helpers
//! - `runtime`: crypto, resilience (backoff), time (clock abstraction)
//! - `platform`: OAuth client, SQLCipher storage
//! - `observability`: tracing instrumentation (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod privacy;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod crypto;
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;
#[cfg(feature = "platform")]
pub mod storage;

// Re-exports
// ------------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub use crypto::{EncryptedData, EncryptionService};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult};
#[cfg(feature = "foundation")]
pub use privacy::redact_email;
#[cfg(feature = "runtime")]
pub use resilience::RetryStrategy;
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
