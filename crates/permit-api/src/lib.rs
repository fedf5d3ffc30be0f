//! # Permit API
//!
//! HTTP service in front of a [`permit_store::Keeper`].
//!
//! ## Routes
//!
//! - `POST /check` - public, rate limited per client IP. Body `{key, domain, attributes?}`.
//!   Answers with the stored permit, or 400/401/404/429/500 and `{"error": ...}`.
//! - `POST /key` - requires `Authorization: Bearer <HS256 JWT>`. Body
//!   `{domain, attributes?, contact?, entity?, type?}`. Answers with the new permit.
//! - anything else - a small HTML landing page.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! use permit_api::{build_router, ApiConfig, AppState};
//! use permit_store::MemoryStore;
//!
//! async fn example() {
//!     let state = AppState::new(Arc::new(MemoryStore::new()), &ApiConfig::new("secret"));
//!     let app = build_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod auth;
pub mod check;
pub mod create;
pub mod error;
pub mod landing;
pub mod rate_limit;
pub mod state;

use axum::extract::Request;
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use check::CheckRequest;
pub use create::CreateRequest;
pub use error::{ApiError, ErrorBody, Result};
pub use state::{ApiConfig, AppState, DEFAULT_CHECK_REQUESTS_PER_HOUR, RATE_LIMIT_PRUNE_INTERVAL};

/// Build the HTTP router.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// check quota is tracked per client.
pub fn build_router(state: AppState) -> Router {
    let limiter = state.limiter.clone();

    let check = Router::new()
        .route("/check", post(check::check_permit))
        .route_layer(from_fn(move |req: Request, next: Next| {
            let limiter = limiter.clone();
            rate_limit::rate_limit_middleware(limiter, req, next)
        }));

    let create = Router::new()
        .route("/key", post(create::create_permit))
        .route_layer(from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .merge(check)
        .merge(create)
        .fallback(landing::landing)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use std::io;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, StatusCode};
    use permit_core::{Mutation, Permit};
    use permit_store::{Keeper, ListQuery, MemoryStore, StoreError};
    use tower::ServiceExt;
    use tracing_subscriber::layer::SubscriberExt;

    fn router() -> Router {
        build_router(AppState::new(
            Arc::new(MemoryStore::new()),
            &ApiConfig::new("secret"),
        ))
    }

    #[tokio::test]
    async fn test_unknown_path_serves_landing_page() {
        let response = router()
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_create_without_token_is_unauthorized() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/key")
                    .body(Body::from(r#"{"domain":"example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_check_without_connect_info_is_served() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/check")
                    .body(Body::from(r#"{"key":"abcdef","domain":"example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    /// A keeper whose disk is gone.
    struct UnreadableKeeper;

    #[async_trait]
    impl Keeper for UnreadableKeeper {
        async fn list(&self, _query: &ListQuery) -> permit_store::Result<Vec<Permit>> {
            Err(StoreError::InvalidData("disk gone".into()))
        }

        async fn get(&self, _key: &str) -> permit_store::Result<Permit> {
            Err(StoreError::InvalidData("disk gone".into()))
        }

        async fn create(&self, _permit: &Permit) -> permit_store::Result<()> {
            Err(StoreError::InvalidData("disk gone".into()))
        }

        async fn update(&self, _key: &str, _mutation: Mutation) -> permit_store::Result<()> {
            Err(StoreError::InvalidData("disk gone".into()))
        }

        async fn delete(&self, _key: &str) -> permit_store::Result<()> {
            Err(StoreError::InvalidData("disk gone".into()))
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn lines_containing(&self, needle: &str) -> usize {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .filter(|line| line.contains(needle))
                .count()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_logged_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );
        let _default = tracing::subscriber::set_default(subscriber);

        let app = build_router(AppState::new(
            Arc::new(UnreadableKeeper),
            &ApiConfig::new("secret"),
        ));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/check")
                    .body(Body::from(r#"{"key":"abcdef","domain":"example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(logs.lines_containing("disk gone"), 1);
        assert_eq!(logs.lines_containing("permit check rejected"), 0);
    }
}
