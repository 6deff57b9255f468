//! # Middleware Module
//!
//! CORS and rate limiting for the MineralSpace HTTP API, both driven by
//! [`ServerConfig`].

use crate::config::ServerConfig;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Origins allowed when none are configured.
const LOCALHOST_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8080",
];

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Global (unkeyed) rate limiter.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Build the limiter for `config.rate_limit`, or `None` when disabled.
pub fn rate_limiter_for(config: &ServerConfig) -> Option<GlobalRateLimiter> {
    let rps = NonZeroU32::new(config.rate_limit)?;
    Some(Arc::new(RateLimiter::direct(Quota::per_second(rps))))
}

/// Answer 429 once the global quota is exhausted.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if limiter.check().is_err() {
        tracing::warn!(path = request.uri().path(), "Rate limit exceeded");
        return Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"));
    }
    Ok(next.run(request).await)
}

// =============================================================================
// CORS
// =============================================================================

/// Build the CORS layer from `config.cors_origins`.
///
/// - `None` or no valid entries: localhost origins only
/// - `["*"]`: any origin (logged as a warning)
/// - otherwise: exactly the listed origins
pub fn cors_layer_for(config: &ServerConfig) -> CorsLayer {
    let Some(configured) = &config.cors_origins else {
        return restricted_cors(localhost_origins());
    };

    if configured.iter().any(|origin| origin == "*") {
        tracing::warn!("CORS: allowing ALL origins; do not use this in production");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: ignoring invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: no valid origins configured, falling back to localhost");
        return restricted_cors(localhost_origins());
    }
    restricted_cors(origins)
}

fn localhost_origins() -> Vec<HeaderValue> {
    LOCALHOST_ORIGINS
        .iter()
        .map(|origin| HeaderValue::from_static(*origin))
        .collect()
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_limit_disables_limiter() {
        let config = ServerConfig {
            rate_limit: 0,
            ..ServerConfig::default()
        };
        assert!(rate_limiter_for(&config).is_none());
    }

    #[test]
    fn limiter_enforces_quota() {
        let config = ServerConfig {
            rate_limit: 1,
            ..ServerConfig::default()
        };
        let limiter = rate_limiter_for(&config).unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
