//! API error type and conversions.
//!
//! Every failure leaves the server as `{"code", "message"}` with a status
//! matching its category. Unexpected failures are logged here and reach the
//! caller only as a generic message.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tally_auth::GateError;
use tally_core::error::TallyError;

use crate::api::types::ErrorResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn api_validation_error(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_unauthorized(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn api_internal() -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
}

impl From<TallyError> for ApiError {
    fn from(err: TallyError) -> Self {
        match err {
            TallyError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            TallyError::AlreadyExists { .. } => {
                ApiError::new(StatusCode::CONFLICT, "already_exists", err.to_string())
            }
            TallyError::AuthenticationFailed { .. } => api_unauthorized(err.to_string()),
            TallyError::TokenExpired => {
                ApiError::new(StatusCode::UNAUTHORIZED, "token_expired", err.to_string())
            }
            TallyError::TokenDenied => {
                ApiError::new(StatusCode::UNAUTHORIZED, "token_denied", err.to_string())
            }
            TallyError::AuthorizationDenied { .. } => api_forbidden(err.to_string()),
            TallyError::Validation { message } => api_validation_error(message),
            TallyError::Database(_) | TallyError::Crypto(_) | TallyError::Internal(_) => {
                tracing::error!(error = %err, "request failed");
                api_internal()
            }
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthorized(reason) => api_unauthorized(reason),
            GateError::TokenExpired => {
                ApiError::new(StatusCode::UNAUTHORIZED, "token_expired", "token expired")
            }
            GateError::TokenDenied => {
                ApiError::new(StatusCode::UNAUTHORIZED, "token_denied", "token denied")
            }
            GateError::Forbidden => api_forbidden("insufficient permissions"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        api_validation_error(rejection.body_text())
    }
}
