use thiserror::Error;

use crate::auth::{JwtError, PasswordError};
use crate::database::DatabaseError;

/// Domain failures raised by the policy, code generator and registries
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    /// Bad input pinned to one request field
    #[error("{message}")]
    InvalidField { field: &'static str, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation; for generated codes the client may retry
    #[error("{0}")]
    Conflict(String),

    #[error("No EXMR sequence numbers left under {he_code} (maximum {max})")]
    SequenceExhausted { he_code: String, max: u32 },

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Database(DatabaseError),
}

impl ServiceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }

    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Database(other),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken(msg) => ServiceError::Unauthorized(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
