//! Assignment status resolution

mod resolver;

pub use resolver::StatusResolver;
