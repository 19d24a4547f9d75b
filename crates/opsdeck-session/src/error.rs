//! Session-specific error types.

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while logging in, logging out, or touching the
/// token store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No response received from either auth endpoint.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Both the primary and the demo endpoint rejected the credential.
    /// The message is the most specific one the server provided.
    #[error("{message}")]
    Credentials { message: String },

    /// The durable token store could not be read or written.
    #[error("token store error: {message}")]
    Store { message: String },
}

impl Error {
    /// Creates a new token store error.
    pub fn store<S: Into<String>>(message: S) -> Self {
        Error::Store {
            message: message.into(),
        }
    }

    /// Whether this failure is a transport failure, as opposed to a
    /// rejected credential.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_error_displays_server_message() {
        let err = Error::Credentials {
            message: "Wrong demo password".to_string(),
        };
        assert_eq!(err.to_string(), "Wrong demo password");
        assert!(!err.is_network());
    }

    #[test]
    fn test_store_error_display() {
        let err = Error::store("permission denied");
        assert_eq!(err.to_string(), "token store error: permission denied");
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
