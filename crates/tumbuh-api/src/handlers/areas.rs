use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tumbuh_core::models::{
    AreaId, AreaResult, AreaStatus, AreaStatusView, AreaSummary, Page, SubmitArea,
};
use tumbuh_pipeline::TileMetricView;

use crate::dto::{SubmitResponse, TilesQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// Parse an area id path segment
pub(crate) fn parse_area_id(raw: &str) -> Result<AreaId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid area id").with_details(raw.to_string()))
}

/// POST /api/v1/areas
///
/// Admits the polygon and starts processing in the background.
pub async fn submit_area(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitArea>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let area_id = state.orchestrator.submit(request).await.map_err(|e| {
        tracing::warn!(error = %e, "Area submission rejected");
        ApiError::from(e)
    })?;

    tracing::info!(area_id = %area_id, "Area accepted");
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { area_id, status: AreaStatus::Pending })))
}

/// GET /api/v1/areas
pub async fn list_areas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AreaSummary>>, ApiError> {
    let areas = state.orchestrator.store().list_areas().await?;
    Ok(Json(areas))
}

/// GET /api/v1/areas/{id}
pub async fn get_area_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AreaStatusView>, ApiError> {
    let id = parse_area_id(&id)?;
    Ok(Json(state.orchestrator.status(id).await?))
}

/// GET /api/v1/areas/{id}/result
pub async fn get_area_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AreaResult>, ApiError> {
    let id = parse_area_id(&id)?;
    Ok(Json(state.orchestrator.result(id).await?))
}

/// GET /api/v1/areas/{id}/tiles
pub async fn list_area_tiles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TilesQuery>,
) -> Result<Json<Page<TileMetricView>>, ApiError> {
    let id = parse_area_id(&id)?;
    let store = state.orchestrator.store();

    if store.get_area(id).await?.is_none() {
        return Err(ApiError::not_found("Area not found").with_details(id.to_string()));
    }

    let page = store.get_tiles(id, query.page_request()).await?;
    let catalog = state.catalog();
    Ok(Json(page.map(|tile| catalog.tile_view(&tile))))
}
