//! Symmetric encryption used for credentials at rest.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService};
