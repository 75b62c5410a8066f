//! Resilience helpers for calls to external services.

pub mod backoff;

pub use backoff::RetryStrategy;
