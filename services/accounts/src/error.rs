//! Custom error types for the accounts service
//!
//! Every failure leaving a handler goes through [`ApiError`], which renders
//! the JSON shapes clients rely on:
//!
//! - `400 {"error": "Validation failed", "details": {field: [messages]}}`
//! - `401 {"detail": message}`
//! - `500 {"detail": "Internal server error"}`

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::{jwt::TokenError, repositories::RepositoryError, validation::FieldErrors};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const ACCOUNT_DISABLED: &str = "User account is disabled.";
pub const CREDENTIALS_NOT_PROVIDED: &str = "Authentication credentials were not provided.";
pub const TOKEN_INVALID: &str = "Given token is invalid or expired.";
pub const MALFORMED_JSON: &str = "Malformed JSON request body.";
pub const EXPECTED_OBJECT: &str = "Invalid data. Expected a JSON object.";
pub const UNSUPPORTED_BODY: &str = "Request body must be JSON with Content-Type: application/json.";

/// Custom error type for the accounts service
#[derive(Error, Debug)]
pub enum ApiError {
    /// One or more request fields failed validation
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Unknown email or wrong password; the two are never distinguished
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Correct credentials for a deactivated account
    #[error("Account disabled")]
    AccountDisabled,

    /// No `Authorization` header on a protected route
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    /// Malformed, expired, mis-signed or mis-typed token, or a token whose
    /// user no longer exists or is inactive
    #[error("Token invalid or expired")]
    InvalidToken,

    /// Anything unexpected; logged, never shown to the caller
    #[error("Internal server error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal(error.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::AccountDisabled
            | ApiError::MissingCredentials
            | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(field) => {
                ApiError::Validation(FieldErrors::single(field.field_name(), field.message()))
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired | TokenError::Invalid(_) | TokenError::WrongType(_) => {
                ApiError::InvalidToken
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());

        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => UNSUPPORTED_BODY,
            JsonRejection::JsonSyntaxError(_) => MALFORMED_JSON,
            JsonRejection::JsonDataError(_) => EXPECTED_OBJECT,
            _ => MALFORMED_JSON,
        };
        ApiError::Validation(FieldErrors::single("non_field_errors", message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::Validation(details) => json!({
                "error": "Validation failed",
                "details": details,
            }),
            ApiError::InvalidCredentials => json!({ "detail": INVALID_CREDENTIALS }),
            ApiError::AccountDisabled => json!({ "detail": ACCOUNT_DISABLED }),
            ApiError::MissingCredentials => json!({ "detail": CREDENTIALS_NOT_PROVIDED }),
            ApiError::InvalidToken => json!({ "detail": TOKEN_INVALID }),
            ApiError::Internal(e) => {
                error!("Unhandled error: {:#}", e);
                json!({ "detail": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
