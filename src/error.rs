// src/error.rs

use std::any::Any;

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Request-level failures of the submission endpoint.
///
/// Only input-shape problems and genuine internal faults live here. A failed
/// or unconfigured notification is a normal outcome and never becomes an `AppError`.
#[derive(Debug)]
pub enum AppError {
    // 400 Bad Request: body present but not a usable JSON object
    MalformedInput(String),

    // 400 Bad Request: body empty, whitespace or `null`
    MissingInput,

    // 405 Method Not Allowed
    UnsupportedMethod(Method),

    // 500 Internal Server Error
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MalformedInput(msg) => write!(f, "malformed input: {}", msg),
            AppError::MissingInput => write!(f, "missing submission data"),
            AppError::UnsupportedMethod(method) => write!(f, "unsupported method {}", method),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MalformedInput(details) => {
                tracing::warn!("Rejected malformed submission: {}", details);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Invalid JSON", "details": details }),
                )
            }
            AppError::MissingInput => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Missing submission data" }),
            ),
            AppError::UnsupportedMethod(method) => {
                tracing::debug!("Rejected {} request", method);
                (
                    StatusCode::METHOD_NOT_ALLOWED,
                    json!({ "error": "Method not allowed" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "message": msg }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedInput(err.to_string())
    }
}

/// Panic hook for `CatchPanicLayer`: a panic anywhere in the stack becomes a 500.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal(detail).into_response()
}
