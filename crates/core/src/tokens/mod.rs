//! OAuth credential lifecycle

pub mod manager;
pub mod ports;

pub use manager::TokenLifecycleManager;
pub use ports::*;
