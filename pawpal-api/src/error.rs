//! Errors returned by the messaging transport.
//!
//! Callers classify failures by whether an HTTP status is available:
//! [`ApiError::status`] returns `None` for connectivity problems and
//! `Some(code)` whenever the server answered.

use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Transport failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No HTTP response was received (DNS, connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The server answered successfully but the body could not be decoded.
    #[error("invalid response body (status {status}): {message}")]
    InvalidResponse { status: u16, message: String },

    /// The configured base URL cannot carry request paths.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status associated with this error, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } | ApiError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            ApiError::Network(_) | ApiError::InvalidUrl(_) => None,
        }
    }

    /// Whether the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => ApiError::Network(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ApiError::Network("refused".into()).status(), None);
        assert_eq!(ApiError::InvalidUrl("mailto:x".into()).status(), None);
        let err = ApiError::Status {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_not_found());

        let err = ApiError::Status {
            status: 404,
            message: "missing".into(),
        };
        assert!(err.is_not_found());

        let err = ApiError::InvalidResponse {
            status: 200,
            message: "expected array".into(),
        };
        assert_eq!(err.status(), Some(200));
    }
}
