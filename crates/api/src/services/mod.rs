//! Application services composed from core and infra

pub mod connect;

pub use connect::{ConnectService, ConnectStart};
