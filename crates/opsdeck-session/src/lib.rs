//! Opsdeck auth session.
//!
//! Owns the single credential token used to authenticate API calls:
//! - [`Session`] — explicit, injectable session state (anonymous or
//!   authenticated), cloned into collaborators rather than read as a global
//! - [`TokenStore`] — durable storage seam for the token
//! - login with demo fallback, logout, and restore-on-startup
//!
//! Restore trusts token presence: no validity probe is made, so a stale
//! token surfaces only when a later API call fails.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use opsdeck_core::ApiConfig;

pub mod error;
pub mod store;

pub use error::{Error, Result};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Email sent to the primary login endpoint when the caller provides none.
pub const DEFAULT_LOGIN_EMAIL: &str = "admin@example.com";

/// Error message recorded when neither auth endpoint could be reached.
const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Fallback message when the demo endpoint rejects without a message body.
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct DemoRequest<'a> {
    password: &'a str,
}

/// Body of an auth endpoint response. Both fields are optional: success
/// bodies may omit the token, failure bodies may omit the message.
#[derive(Debug, Default, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    token: Option<String>,
    authenticated: bool,
    error: Option<String>,
}

/// The process-wide auth session.
///
/// Cheap to clone (Arc internals); all clones share one state. On
/// construction the session restores itself from the token store: token
/// present means authenticated.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    http: reqwest::Client,
    login_url: String,
    demo_url: String,
    store: Box<dyn TokenStore>,
    state: RwLock<State>,
}

impl Session {
    /// Create a session against the given API, restoring state from the
    /// store.
    ///
    /// An unreadable store is treated as an absent token (the session starts
    /// anonymous) rather than a startup failure.
    pub fn new(config: &ApiConfig, store: impl TokenStore + 'static) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Could not restore session token: {e}");
                None
            }
        };
        let authenticated = token.is_some();
        if authenticated {
            log::debug!("Session restored as authenticated");
        }

        Self {
            inner: Arc::new(SessionInner {
                http: reqwest::Client::new(),
                login_url: config.url("/api/auth/login"),
                demo_url: config.url("/api/auth/demo"),
                store: Box::new(store),
                state: RwLock::new(State {
                    token,
                    authenticated,
                    error: None,
                }),
            }),
        }
    }

    /// Whether the session currently holds an authenticated state.
    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.authenticated)
    }

    /// The error message from the most recent failed login, if any.
    pub fn last_error(&self) -> Option<String> {
        self.read(|state| state.error.clone())
    }

    /// The current token, for attaching as a bearer credential.
    pub fn bearer_token(&self) -> Option<String> {
        self.read(|state| state.token.clone())
    }

    /// Attempt to authenticate.
    ///
    /// Tries the primary login endpoint with email and password; on a
    /// non-success status falls back to the demo endpoint with the password
    /// alone. Whichever call succeeds, a returned token is persisted and the
    /// session becomes authenticated. If both reject, the session stays
    /// anonymous with the demo endpoint's message recorded (or the generic
    /// fallback). Transport failures are reported distinctly.
    pub async fn login(&self, password: &str, email: Option<&str>) -> Result<()> {
        let email = email.unwrap_or(DEFAULT_LOGIN_EMAIL);

        let primary = self
            .inner
            .http
            .post(&self.inner.login_url)
            .json(&LoginRequest { email, password })
            .send()
            .await;
        let primary = match primary {
            Ok(resp) => resp,
            Err(e) => return self.fail_network(e),
        };

        if primary.status().is_success() {
            let body: AuthResponse = primary.json().await.unwrap_or_default();
            return self.succeed(body.token);
        }
        log::debug!(
            "Primary login rejected ({}), falling back to demo endpoint",
            primary.status()
        );

        let demo = self
            .inner
            .http
            .post(&self.inner.demo_url)
            .json(&DemoRequest { password })
            .send()
            .await;
        let demo = match demo {
            Ok(resp) => resp,
            Err(e) => return self.fail_network(e),
        };

        let status = demo.status();
        let body: AuthResponse = demo.json().await.unwrap_or_default();
        if !status.is_success() {
            let message = body
                .message
                .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string());
            self.write(|state| {
                state.authenticated = false;
                state.error = Some(message.clone());
            });
            return Err(Error::Credentials { message });
        }

        self.succeed(body.token)
    }

    /// Drop back to anonymous: clear the persisted token and any stored
    /// error.
    pub fn logout(&self) -> Result<()> {
        self.inner.store.clear()?;
        self.write(|state| {
            state.token = None;
            state.authenticated = false;
            state.error = None;
        });
        log::info!("Session logged out");
        Ok(())
    }

    fn succeed(&self, token: Option<String>) -> Result<()> {
        if let Some(token) = &token {
            self.inner.store.save(token)?;
        }
        self.write(|state| {
            if token.is_some() {
                state.token = token.clone();
            }
            state.authenticated = true;
            state.error = None;
        });
        log::info!("Session authenticated");
        Ok(())
    }

    fn fail_network(&self, source: reqwest::Error) -> Result<()> {
        self.write(|state| {
            state.authenticated = false;
            state.error = Some(NETWORK_ERROR_MESSAGE.to_string());
        });
        Err(Error::Network(source))
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        let guard = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut State)) {
        let mut guard = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig::new("http://localhost:4000")
    }

    #[test]
    fn test_restore_with_token_is_authenticated() {
        let session = Session::new(&config(), MemoryTokenStore::with_token("tok-1"));
        assert!(session.is_authenticated());
        assert_eq!(session.bearer_token(), Some("tok-1".to_string()));
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn test_restore_without_token_is_anonymous() {
        let session = Session::new(&config(), MemoryTokenStore::new());
        assert!(!session.is_authenticated());
        assert_eq!(session.bearer_token(), None);
    }

    #[test]
    fn test_logout_clears_store_and_state() {
        let store = Arc::new(MemoryTokenStore::with_token("tok-1"));
        let session = Session::new(&config(), store.clone());
        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.bearer_token(), None);

        // A restart (fresh session over the same store) stays anonymous.
        let session2 = Session::new(&config(), store);
        assert!(!session2.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new(&config(), MemoryTokenStore::with_token("tok-1"));
        let clone = session.clone();
        session.logout().unwrap();
        assert!(!clone.is_authenticated());
    }

    #[test]
    fn test_session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }
}
