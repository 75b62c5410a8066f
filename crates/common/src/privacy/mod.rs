//! Privacy helpers for log output

pub mod redact;

pub use redact::redact_email;
