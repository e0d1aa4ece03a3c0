use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tumbuh_core::models::HyperlocalPayload;

use super::areas::parse_area_id;
use crate::dto::HyperlocalQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/areas/{id}/hyperlocal
pub async fn get_hyperlocal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HyperlocalQuery>,
) -> Result<Json<HyperlocalPayload>, ApiError> {
    let id = parse_area_id(&id)?;
    let payload = state.hyperlocal.insights(id, query.refresh).await?;
    Ok(Json(payload))
}
