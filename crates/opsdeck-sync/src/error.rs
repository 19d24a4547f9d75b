//! Error types for opsdeck-sync.

use crate::key::QueryKey;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when reading through the cache.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The fetch backing a query failed. Every caller joined to the flight
    /// observes the same message.
    #[error("fetch for '{key}' failed: {message}")]
    Fetch {
        /// Key whose fetch failed.
        key: QueryKey,
        /// Rendered fetcher error.
        message: String,
    },

    /// The cached value for this key was stored under a different type.
    #[error("cached value for '{key}' has an unexpected type")]
    Type {
        /// Key with the mismatched value.
        key: QueryKey,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = Error::Fetch {
            key: QueryKey::Tasks,
            message: "HTTP 500 Internal Server Error: boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fetch for 'tasks' failed: HTTP 500 Internal Server Error: boom"
        );
    }

    #[test]
    fn test_error_is_cloneable_for_joined_waiters() {
        let err = Error::Type {
            key: QueryKey::Finance,
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
