//! Error types surfaced by the messaging screens.

use crate::fl;
use pawpal_api::ApiError;
use thiserror::Error;

/// A request refused locally, before anything reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message is empty")]
    EmptyContent,

    #[error("conversation is missing the other user or the pet")]
    MissingIdentifiers,

    #[error("no user is signed in")]
    SignedOut,

    #[error("recipient username is not known yet")]
    UnknownRecipient,
}

/// Failure to send a message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("failed to send message: {0}")]
    Api(#[from] ApiError),
}

/// Classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No HTTP status: the server could not be reached.
    Network,
    /// The server answered with an error status.
    Server { status: u16 },
}

/// A fetch failure as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn from_api(err: &ApiError) -> Self {
        match err {
            ApiError::InvalidResponse { status, .. } => Self {
                kind: ErrorKind::Server { status: *status },
                message: fl!("error-invalid-response"),
            },
            ApiError::Status { status, .. } => Self {
                kind: ErrorKind::Server { status: *status },
                message: fl!("error-server", status = (*status)),
            },
            ApiError::Network(_) | ApiError::InvalidUrl(_) => Self {
                kind: ErrorKind::Network,
                message: fl!("error-network"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_classification() {
        let network = ErrorDescriptor::from_api(&ApiError::Network("connection refused".into()));
        assert_eq!(network.kind, ErrorKind::Network);
        assert!(network.message.contains("connection"));

        let server = ErrorDescriptor::from_api(&ApiError::Status {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(server.kind, ErrorKind::Server { status: 502 });
        assert!(server.message.contains("502"));
    }

    #[test]
    fn test_unreadable_body_is_not_worded_as_an_error_status() {
        let decode = ErrorDescriptor::from_api(&ApiError::InvalidResponse {
            status: 200,
            message: "expected value at line 1".into(),
        });
        assert_eq!(decode.kind, ErrorKind::Server { status: 200 });
        assert_eq!(decode.message, fl!("error-invalid-response"));
        assert!(!decode.message.contains("200"));
    }
}
