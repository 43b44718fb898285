//! crates/timetable_core/src/error.rs
//!
//! The error taxonomy every service operation reports to the HTTP layer.

use crate::ports::PortError;
use crate::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Malformed batch code or missing/invalid request fields.
    #[error("{0}")]
    InvalidInput(String),

    /// Bad API key, admin token or credentials.
    #[error("{0}")]
    AuthFailure(String),

    #[error("{0}")]
    NotFound(String),

    /// IO, database or parse failure inside a store.
    #[error("Store failure: {0}")]
    StoreFailure(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<PortError> for ServiceError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::StoreFailure(other.to_string()),
        }
    }
}
