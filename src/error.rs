//! Error types for the share server.
//!
//! Every error maps to an HTTP status and a deliberately generic message. The
//! detailed cause is logged server-side and never sent to the caller; token
//! failures in particular all look the same from outside.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::share::token::TokenError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// Missing or invalid identity assertion.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Malformed request parameters or body.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Signature, expiry or key-binding failure.
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),

    /// Startup configuration problem. Fatal, never produced per request.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for ShareError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OwnerConflict { .. } => Self::Forbidden(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl ShareError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message callers see.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "Unauthorized",
            Self::Validation(_) => "Bad request",
            Self::Token(_) => "Invalid or expired token",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "Not found",
            Self::Store(_) | Self::Internal(_) | Self::Config(_) => "Internal error",
        }
    }
}

impl IntoResponse for ShareError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "[Share] Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "[Share] Request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for share operations.
pub type Result<T> = std::result::Result<T, ShareError>;
