//! # API Request/Response Types
//!
//! JSON structures for the HTTP API and the mapping from `MineralError` to
//! HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mineralspace_core::{MineralError, MineralReference, StoreSummary};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Reference table status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub reference_count: usize,
    pub curated_count: usize,
    pub external_count: usize,
}

impl From<StoreSummary> for StatusResponse {
    fn from(summary: StoreSummary) -> Self {
        Self {
            reference_count: summary.total,
            curated_count: summary.curated,
            external_count: summary.external,
        }
    }
}

// =============================================================================
// LIST RESPONSE
// =============================================================================

/// All persisted references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineralListResponse {
    pub count: usize,
    pub minerals: Vec<MineralReference>,
}

impl MineralListResponse {
    pub fn new(minerals: Vec<MineralReference>) -> Self {
        Self {
            count: minerals.len(),
            minerals,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind.
    pub kind: String,
    pub error: String,
}

/// `MineralError` rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MineralError);

impl From<MineralError> for ApiError {
    fn from(err: MineralError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code and kind tag for the wrapped error.
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            MineralError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            MineralError::ResolutionFailed(_) => (StatusCode::BAD_GATEWAY, "resolution_failed"),
            MineralError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            MineralError::InvalidIdentifier(_) => (StatusCode::BAD_REQUEST, "invalid_identifier"),
            MineralError::Storage(_)
            | MineralError::Serialization(_)
            | MineralError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(kind, error = %self.0, "Request failed");
        }
        let body = ErrorResponse {
            kind: kind.to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
