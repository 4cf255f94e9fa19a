//! Cryptex REST API
//!
//! HTTP surface of the exchange backend.
//!
//! # API Structure
//!
//! ```text
//! /health                          - liveness
//! /ready                           - readiness (database)
//! /api/
//! ├── /trading-pairs               - active pairs (public)
//! ├── /orders                      - place, list
//! ├── /orders/:id                  - cancel
//! ├── /trades                      - caller's fills
//! ├── /wallets                     - list, create
//! ├── /wallets/:id                 - one wallet
//! ├── /wallets/:id/transactions    - wallet ledger
//! └── /ws                          - order event stream
//! ```
//!
//! All `/api` routes except `/trading-pairs` and `/ws` need a bearer token.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod websocket;

use axum::http::HeaderName;
use axum::Router;
use cryptex_auth::AuthLayer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
    /// Enable response compression
    pub enable_compression: bool,
    /// Enable request tracing
    pub enable_tracing: bool,
    /// Include error causes in response bodies; set from the server environment
    #[serde(skip)]
    pub expose_error_details: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            enable_compression: true,
            enable_tracing: true,
            expose_error_details: false,
        }
    }
}

/// Create the main API router with all middleware
pub fn create_router(state: Arc<AppState>, config: ApiConfig) -> Router {
    let mut router = base_router(state, config.expose_error_details)
        .layer(axum::middleware::from_fn(middleware::timing_middleware));

    // Add request ID middleware
    let x_request_id = HeaderName::from_static("x-request-id");
    router = router
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()));

    // Add tracing
    if config.enable_tracing {
        router = router.layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");

                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        );
    }

    router = router.layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // Add compression
    if config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    // Add CORS
    if config.enable_cors {
        let cors = if config.cors_origins.iter().any(|o| o == "*") {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(
                    config
                        .cors_origins
                        .iter()
                        .filter_map(|o| o.parse().ok())
                        .collect::<Vec<_>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
        };
        router = router.layer(cors);
    }

    router
}

/// Create a router without transport middleware, for tests
pub fn create_test_router(state: Arc<AppState>, expose_error_details: bool) -> Router {
    base_router(state, expose_error_details)
}

fn base_router(state: Arc<AppState>, expose_error_details: bool) -> Router {
    let auth = AuthLayer::new(state.jwt.clone());

    let mut router = Router::new()
        .nest("/api", routes::api_routes().layer(auth))
        .route("/health", axum::routing::get(handlers::health::health_check))
        .route("/ready", axum::routing::get(handlers::health::readiness_check))
        .with_state(state);

    if expose_error_details {
        router = router.layer(axum::middleware::map_response(
            middleware::expose_error_details,
        ));
    }

    router
}
