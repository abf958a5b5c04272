//! Error taxonomy and wire translation.
//!
//! # Design Decisions
//! - Command handlers return typed errors and never write responses
//! - The dispatch adapter is the single error to status translation point
//! - Callers only ever see `{status, {"message": ...}}`, never internals

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Typed errors returned by command handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing resource or unmatched route.
    #[error("{0}")]
    NotFound(String),

    /// Malformed request (bad parameter, unsupported version, ...).
    #[error("{0}")]
    BadRequest(String),

    /// State conflict, e.g. a name already in use.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Catch-all for unclassified failures.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ApiError {
    /// Wrap an arbitrary failure, keeping its causal chain for logging.
    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let source = err.into();
        ApiError::Internal {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// The HTTP status this error maps to on the wire.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error body sent to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Operational errors from the listener manager.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("api listener on {addr} failed: {source}")]
    Serve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("router has not been initialized")]
    RouterNotInitialized,

    #[error("listener on {0} is already closed")]
    AlreadyClosed(String),
}
