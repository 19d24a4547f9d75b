//! Login flow tests against a mock auth server.

use std::sync::Arc;

use axum::extract::Json;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

use opsdeck_core::ApiConfig;
use opsdeck_session::{Error, MemoryTokenStore, Session, TokenStore};

/// Spawn a mock server and return the config pointing at it.
async fn serve(app: Router) -> ApiConfig {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ApiConfig::new(format!("http://{addr}"))
}

/// Auth server accepting one email+password pair on the primary endpoint and
/// one password on the demo endpoint.
fn auth_app() -> Router {
    Router::new()
        .route(
            "/api/auth/login",
            post(|Json(body): Json<Value>| async move {
                if body["email"] == "admin@corp.example" && body["password"] == "hunter2" {
                    (StatusCode::OK, Json(json!({"token": "primary-token"})))
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"message": "Unknown account"})),
                    )
                }
            }),
        )
        .route(
            "/api/auth/demo",
            post(|Json(body): Json<Value>| async move {
                if body["password"] == "demo-pass" {
                    (StatusCode::OK, Json(json!({"token": "demo-token"})))
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"message": "Wrong demo password"})),
                    )
                }
            }),
        )
}

#[tokio::test]
async fn primary_login_succeeds() {
    let config = serve(auth_app()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = Session::new(&config, store.clone());

    session
        .login("hunter2", Some("admin@corp.example"))
        .await
        .unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.last_error(), None);
    assert_eq!(session.bearer_token(), Some("primary-token".to_string()));
    // Token persisted for the next startup.
    assert_eq!(store.load().unwrap(), Some("primary-token".to_string()));
}

#[tokio::test]
async fn demo_fallback_succeeds_when_primary_rejects() {
    let config = serve(auth_app()).await;
    let session = Session::new(&config, MemoryTokenStore::new());

    // Default email fails the primary check; demo accepts the password.
    session.login("demo-pass", None).await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.bearer_token(), Some("demo-token".to_string()));
    assert_eq!(session.last_error(), None);
}

#[tokio::test]
async fn both_rejections_record_demo_message() {
    let config = serve(auth_app()).await;
    let session = Session::new(&config, MemoryTokenStore::new());

    let err = session.login("wrong", None).await.unwrap_err();

    assert!(matches!(err, Error::Credentials { .. }));
    assert_eq!(err.to_string(), "Wrong demo password");
    assert!(!session.is_authenticated());
    assert_eq!(session.last_error(), Some("Wrong demo password".to_string()));
}

#[tokio::test]
async fn rejection_without_message_uses_generic_fallback() {
    let app = Router::new()
        .route(
            "/api/auth/login",
            post(|| async { StatusCode::UNAUTHORIZED }),
        )
        .route(
            "/api/auth/demo",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
    let config = serve(app).await;
    let session = Session::new(&config, MemoryTokenStore::new());

    let err = session.login("anything", None).await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(session.last_error(), Some("Invalid credentials".to_string()));
}

#[tokio::test]
async fn success_without_token_authenticates_without_persisting() {
    let app = Router::new().route(
        "/api/auth/login",
        post(|| async { (StatusCode::OK, Json(json!({}))) }),
    );
    let config = serve(app).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = Session::new(&config, store.clone());

    session.login("whatever", None).await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.bearer_token(), None);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn transport_failure_is_a_network_error() {
    // Nothing listens on this port; connection is refused.
    let config = ApiConfig::new("http://127.0.0.1:1");
    let session = Session::new(&config, MemoryTokenStore::new());

    let err = session.login("hunter2", None).await.unwrap_err();

    assert!(err.is_network());
    assert!(!session.is_authenticated());
    assert_eq!(session.last_error(), Some("Network error".to_string()));
}

#[tokio::test]
async fn login_after_failed_attempt_clears_error() {
    let config = serve(auth_app()).await;
    let session = Session::new(&config, MemoryTokenStore::new());

    let _ = session.login("wrong", None).await;
    assert!(session.last_error().is_some());

    session.login("demo-pass", None).await.unwrap();
    assert_eq!(session.last_error(), None);
}

#[tokio::test]
async fn restart_after_login_restores_authenticated() {
    let config = serve(auth_app()).await;
    let store = Arc::new(MemoryTokenStore::new());

    let session = Session::new(&config, store.clone());
    session.login("demo-pass", None).await.unwrap();

    let restarted = Session::new(&config, store);
    assert!(restarted.is_authenticated());
    assert_eq!(restarted.bearer_token(), Some("demo-token".to_string()));
}
