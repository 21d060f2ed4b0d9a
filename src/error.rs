//! Error types for the inference gateway
//!
//! The taxonomy follows the request path: caller mistakes map to 4xx,
//! provider and tracking faults map to 5xx, configuration faults are
//! fatal at startup and never reached per-request.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway error types
#[derive(Error, Debug)]
pub enum Error {
    /// Caller input violates a documented constraint (empty text, bad
    /// content type). Reported before any remote call is issued.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Structurally malformed request (missing file field, threshold
    /// outside [0, 100]).
    #[error("Unprocessable request: {0}")]
    Unprocessable(String),

    /// The cloud provider call failed or returned an unexpected shape.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The tracking backend is unreachable or rejected a write. Only
    /// surfaces from startup paths; per-request tracking failures are
    /// logged and swallowed.
    #[error("Tracking backend error: {0}")]
    Tracking(String),

    /// Missing or invalid process configuration (fatal at startup).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Short label used for the `errors_total{kind}` counter.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unprocessable(_) => "unprocessable",
            Self::Provider(_) | Self::Http(_) => "provider",
            Self::Tracking(_) => "tracking",
            Self::Config(_) => "config",
        }
    }
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Provider(_) | Self::Tracking(_) | Self::Config(_) | Self::Http(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorBody {
            status: status.as_u16(),
            message: self.to_string(),
        })
    }
}
