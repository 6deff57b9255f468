//! # Authentication Module
//!
//! Optional bearer-token authentication for the MineralSpace HTTP API.
//!
//! Enabled when `server.api_key` (or `MINERALSPACE_API_KEY`) is set. Every
//! endpoint except `/health` then requires:
//!
//! ```text
//! Authorization: Bearer <api-key>
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// The expected key, shared with the middleware.
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    /// `None` for an empty key (authentication disabled).
    pub fn new(key: &str) -> Option<Self> {
        (!key.is_empty()).then(|| Self(Arc::from(key)))
    }

    /// Compare in constant time over the longer of the two lengths.
    pub fn matches(&self, provided: &str) -> bool {
        let expected = self.0.as_bytes();
        let provided = provided.as_bytes();

        let len = expected.len().max(provided.len());
        let mut lhs = vec![0u8; len];
        let mut rhs = vec![0u8; len];
        lhs[..expected.len()].copy_from_slice(expected);
        rhs[..provided.len()].copy_from_slice(provided);

        let same_bytes: bool = lhs.ct_eq(&rhs).into();
        same_bytes && expected.len() == provided.len()
    }
}

/// Reject requests without the configured bearer token.
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if key.matches(token) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(event = "auth_failure", reason = "invalid_api_key", "Invalid API key");
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_bearer_token",
                "Missing bearer token"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_disables_auth() {
        assert!(ApiKey::new("").is_none());
    }

    #[test]
    fn matches_only_exact_key() {
        let key = ApiKey::new("s3cret").expect("non-empty");
        assert!(key.matches("s3cret"));
        assert!(!key.matches("s3cre"));
        assert!(!key.matches("s3cret!"));
        assert!(!key.matches(""));
    }
}
