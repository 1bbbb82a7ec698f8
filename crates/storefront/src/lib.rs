//! Tiendita storefront library.
//!
//! Catalog, cart and admin panel served over axum, backed by a
//! PostgREST-compatible API. Exposed as a library so the binary, the CLI
//! and the integration tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
///
/// Sessions, request ids, tracing and Sentry wrap every route.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(state.config()))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend cannot list products.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().list_products(Some(1)).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::StorefrontConfig;

    fn test_app(backend: &MemoryBackend) -> Router {
        let config = StorefrontConfig::from_lookup(|key| match key {
            "BACKEND_URL" => Some("https://backend.test".to_string()),
            "BACKEND_ANON_KEY" => Some("eyJhbGciOiJIUzI1NiJ9.eyJyb2xlIjoiYW5vbiJ9.x7Lq2Vb".to_string()),
            _ => None,
        })
        .unwrap();
        app(AppState::with_backend(config, Arc::new(backend.clone())))
    }

    async fn status_of(router: Router, path: &str) -> StatusCode {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_readiness_follows_backend() {
        let backend = MemoryBackend::new();
        let router = test_app(&backend);

        assert_eq!(status_of(router.clone(), "/health").await, StatusCode::OK);
        assert_eq!(status_of(router.clone(), "/health/ready").await, StatusCode::OK);

        backend.set_offline(true);
        assert_eq!(status_of(router.clone(), "/health").await, StatusCode::OK);
        assert_eq!(
            status_of(router, "/health/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let router = test_app(&MemoryBackend::new());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
