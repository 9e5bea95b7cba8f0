//! Typed error handling for the resource layer
//!
//! Every failure that can surface from the request pipeline is one of a
//! small set of kinds, each mapped to an HTTP status code. Handlers return
//! [`RestError`] directly; the [`IntoResponse`] impl renders the
//! `{"message": "<text>"}` envelope clients see.
//!
//! # Error Kinds
//!
//! - [`RestError::Validation`]: malformed or disallowed input (unknown
//!   operator, schema mismatch, unknown query key) → 400
//! - [`RestError::BadRequest`]: existence/uniqueness constraint violation → 400
//! - [`RestError::Unauthorized`]: missing or invalid principal → 401
//! - [`RestError::Forbidden`]: principal lacks access → 403
//! - [`RestError::NotFound`]: missing primary-key row → 404
//! - [`RestError::Internal`]: unexpected storage/runtime failure → 500,
//!   logged server-side, never detailed to the caller

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The error type for all request-pipeline failures
#[derive(Debug)]
pub enum RestError {
    /// Malformed or disallowed input
    Validation(String),

    /// Constraint violation (existence/uniqueness)
    BadRequest(String),

    /// Missing or invalid principal
    Unauthorized(String),

    /// Principal is not allowed to perform the action
    Forbidden,

    /// Primary-key lookup found no row
    NotFound,

    /// Unexpected storage or runtime failure. The inner detail is logged
    /// server-side and never sent to the caller.
    Internal(String),
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for RestError {}

/// Error response envelope sent to clients
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl RestError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::Validation(_) => StatusCode::BAD_REQUEST,
            RestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RestError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RestError::Forbidden => StatusCode::FORBIDDEN,
            RestError::NotFound => StatusCode::NOT_FOUND,
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed to the caller
    pub fn message(&self) -> String {
        match self {
            RestError::Validation(msg) => msg.clone(),
            RestError::BadRequest(msg) => msg.clone(),
            RestError::Unauthorized(msg) => msg.clone(),
            RestError::Forbidden => "Forbidden".to_string(),
            RestError::NotFound => "Not Found".to_string(),
            RestError::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        if let RestError::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal error");
        }
        let status = self.status_code();
        let body = Json(ErrorBody {
            message: self.message(),
        });
        (status, body).into_response()
    }
}

impl From<crate::storage::StoreError> for RestError {
    fn from(err: crate::storage::StoreError) -> Self {
        RestError::Internal(err.to_string())
    }
}

/// A specialized Result type for request-pipeline operations
pub type RestResult<T> = Result<T, RestError>;
