//! Error types for opsdeck-client.

use reqwest::StatusCode;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the remote API.
///
/// The taxonomy mirrors what callers need to react to: transport failures
/// (no response at all), rejected requests (non-2xx, with whatever message
/// the server provided), undecodable bodies, and client-side validation
/// failures that never reached the wire.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No response received.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status code.
        status: StatusCode,
        /// Server-provided message, or the status' canonical reason.
        message: String,
    },

    /// A success response carried a body we could not decode.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] reqwest::Error),

    /// The payload failed client-side validation; no request was sent.
    #[error(transparent)]
    Validation(#[from] opsdeck_core::Error),
}

impl Error {
    /// Whether this is a transport failure (no response received).
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// The HTTP status of a rejected request, if that is what this is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = Error::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "database unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 500 Internal Server Error: database unavailable"
        );
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!err.is_network());
    }

    #[test]
    fn test_validation_error_passes_through() {
        let err: Error = opsdeck_core::Error::validation_field("name", "name is required").into();
        assert_eq!(err.to_string(), "Validation error: name is required");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
