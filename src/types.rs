//! Error taxonomy shared across the crate
//!
//! Every operation returns one of these terminal errors; nothing is
//! retried internally. Callers should treat any error from a fan-out
//! operation as "state possibly partially applied".

use thiserror::Error;

/// Errors raised by Cardway operations
#[derive(Debug, Error)]
pub enum CardwayError {
    /// No credential or an invalid one
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not entitled (wrong owner, direct fork edit, ...)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Referenced deck/card/category/user is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Field constraint violation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Credential processing failure (hashing, token encoding)
    #[error("auth error: {0}")]
    Auth(String),

    /// Persistence port failure
    #[error("database error: {0}")]
    Database(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, CardwayError>;

impl CardwayError {
    /// Forbidden with a formatted reason
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CardwayError::Forbidden(reason.into())
    }

    /// NotFound for an entity kind and id
    pub fn not_found(kind: &str, id: &str) -> Self {
        CardwayError::NotFound(format!("{kind} {id}"))
    }
}
