//! # API Endpoint Handlers

use super::{
    AppState,
    types::{ApiError, HealthResponse, MineralListResponse, StatusResponse},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use mineralspace_core::{MineralId, MineralReference, SpecimenRecord, SpecimenView};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Reference counts by provenance.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let summary = state.resolver.summary().await?;
    Ok(Json(summary.into()))
}

// =============================================================================
// MINERAL HANDLERS
// =============================================================================

/// Resolve a mineral reference, fetching it from Wikidata on first use.
///
/// 404 when the id is unknown locally and externally, 502 when the external
/// source is unavailable.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MineralReference>, ApiError> {
    let id = MineralId::parse(raw_id)?;
    let resolved = state.resolver.resolve_traced(&id).await?;
    tracing::debug!(mineral_id = %id, outcome = resolved.outcome.as_str(), "Resolved");
    Ok(Json(resolved.record))
}

/// List every persisted reference (no external calls).
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<MineralListResponse>, ApiError> {
    let minerals = state.resolver.list().await?;
    Ok(Json(MineralListResponse::new(minerals)))
}

/// Add a curated reference. Provenance is forced to `curated`.
pub async fn create_handler(
    State(state): State<AppState>,
    Json(record): Json<MineralReference>,
) -> Result<(StatusCode, Json<MineralReference>), ApiError> {
    let stored = state.resolver.add_curated(record).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

// =============================================================================
// SPECIMEN VIEW HANDLER
// =============================================================================

/// Attach the persisted reference to a specimen record.
pub async fn specimen_view_handler(
    State(state): State<AppState>,
    Json(specimen): Json<SpecimenRecord>,
) -> Result<Json<SpecimenView>, ApiError> {
    let view = state.resolver.view_specimen(specimen).await?;
    Ok(Json(view))
}
