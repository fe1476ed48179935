//! Error types for the tally system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token denied")]
    TokenDenied,

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TallyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// True for failures the caller did not cause (store, transport, crypto).
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Crypto(_) | Self::Internal(_)
        )
    }
}

pub type TallyResult<T> = Result<T, TallyError>;
