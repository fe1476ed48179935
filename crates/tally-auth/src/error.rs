//! Authentication error types.

use tally_core::error::TallyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    /// Signature was fine but the token lacks a usable id.
    #[error("token denied")]
    TokenDenied,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for TallyError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::TokenInvalid(_) => {
                TallyError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::TokenExpired => TallyError::TokenExpired,
            AuthError::TokenDenied => TallyError::TokenDenied,
            AuthError::WeakPassword { .. } => TallyError::Validation {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => TallyError::Crypto(msg),
        }
    }
}
