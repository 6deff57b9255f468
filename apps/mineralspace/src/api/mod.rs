//! # MineralSpace HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /minerals/{mineral_id}` - Resolve a reference (Wikidata on first use)
//! - `GET /minerals` - List persisted references
//! - `POST /minerals` - Add a curated reference
//! - `POST /specimens/view` - Attach the persisted reference to a specimen
//! - `GET /status` - Reference counts
//! - `GET /health` - Health check
//!
//! ## Status Codes
//!
//! | Error                | Status |
//! |----------------------|--------|
//! | `NotFound`           | 404    |
//! | `ResolutionFailed`   | 502    |
//! | `Conflict`           | 409    |
//! | `InvalidIdentifier`  | 400    |
//! | storage failures     | 500    |

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::ApiKey;
pub use handlers::{
    create_handler, health_handler, list_handler, resolve_handler, specimen_view_handler,
    status_handler,
};
pub use middleware::{cors_layer_for, rate_limiter_for};
pub use types::{ApiError, ErrorResponse, HealthResponse, MineralListResponse, StatusResponse};

use crate::config::ServerConfig;
use crate::resolver::ReferenceResolver;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use mineralspace_core::MineralError;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Maximum request body size.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ReferenceResolver>,
}

impl AppState {
    #[must_use]
    pub fn new(resolver: ReferenceResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if `rate_limit > 0`)
/// 5. Authentication (if an API key is configured)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/minerals",
            get(handlers::list_handler).post(handlers::create_handler),
        )
        .route("/minerals/{mineral_id}", get(handlers::resolve_handler))
        .route("/specimens/view", post(handlers::specimen_view_handler));

    match config.api_key.as_deref().and_then(ApiKey::new) {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::require_api_key,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED - set MINERALSPACE_API_KEY to enable it"
        ),
    }

    match rate_limiter_for(config) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer_for(config))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(config: &ServerConfig, resolver: ReferenceResolver) -> Result<(), MineralError> {
    let router = create_router(AppState::new(resolver), config);
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MineralError::Config(format!("Bind {addr} failed: {e}")))?;

    tracing::info!("MineralSpace HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MineralError::Storage(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
