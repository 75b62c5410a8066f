//! Error type shared by the DueSync common building blocks
//!
//! Module-specific errors compose with `CommonError` instead of duplicating
//! its variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum CipherError {
//!     #[error("token payload is empty")]
//!     Empty,
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```

use std::fmt;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Failures raised by the shared crypto helpers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Missing or malformed configuration
    Config { message: String, field: Option<String> },

    /// Serialization or deserialization errors
    Serialization { message: String },

    /// Internal errors that shouldn't normally occur
    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field } => match field {
                Some(field) => write!(f, "Configuration error in field '{}': {}", field, message),
                None => write!(f, "Configuration error: {}", message),
            },
            Self::Serialization { message } => write!(f, "Serialization error: {}", message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    /// Create a configuration error for a specific field
    pub fn config_field<S: Into<String>, F: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { message: err.to_string() }
    }
}
