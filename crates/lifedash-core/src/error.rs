//! API error taxonomy
//!
//! Every failure the client can observe collapses into one [`ApiError`]:
//! transport failures, non-2xx statuses, undecodable bodies, requests
//! rejected before they were sent, and expired sessions.

use thiserror::Error;

/// Errors returned by the API client and sync actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport-level failure (connection refused, DNS, timeout)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Body was not JSON, or not the shape this endpoint returns
    #[error("Invalid response: {0}")]
    Parse(String),

    /// Caller omitted required fields; no request was issued
    #[error("Missing required field(s): {}", .fields.join(", "))]
    Validation { fields: Vec<String> },

    /// Token expired or rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Request was superseded by a newer one and aborted
    #[error("Request cancelled")]
    Cancelled,
}

/// Result type for API calls and sync actions
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
        }
    }

    pub fn validation<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ApiError::Validation {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// HTTP status code, when the server produced one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// Whether an idempotent request failing this way may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network { .. } => true,
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
