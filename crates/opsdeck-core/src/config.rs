//! Remote API configuration.
//!
//! The base URL is the only remote configuration Opsdeck carries. It is read
//! once from the environment (`OPSDECK_API_BASE`) and passed to collaborators
//! rather than re-read ambiently.

/// Environment variable naming the remote API base URL.
pub const API_BASE_ENV: &str = "OPSDECK_API_BASE";

/// Base URL used when `OPSDECK_API_BASE` is unset.
pub const DEFAULT_API_BASE: &str = "http://localhost:4000";

/// Connection settings for the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// Create a config pointing at the given base URL.
    ///
    /// A trailing slash is stripped so endpoint paths can always be joined
    /// with a leading `/api/...`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Read the base URL from `OPSDECK_API_BASE`, falling back to the
    /// localhost default.
    pub fn from_env() -> Self {
        let base = std::env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(base)
    }

    /// The configured base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an absolute endpoint path (e.g. `/api/projects`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = ApiConfig::new("https://api.example.com/");
        assert_eq!(config.base_url(), "https://api.example.com");

        let config = ApiConfig::new("https://api.example.com///");
        assert_eq!(config.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_url_joins_path() {
        let config = ApiConfig::new("http://localhost:4000");
        assert_eq!(
            config.url("/api/projects"),
            "http://localhost:4000/api/projects"
        );
    }

    #[test]
    fn test_default_points_at_localhost() {
        assert_eq!(ApiConfig::default().base_url(), DEFAULT_API_BASE);
    }
}
