use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health_check))

        // Areas
        .route("/api/v1/areas", post(handlers::submit_area).get(handlers::list_areas))
        .route("/api/v1/areas/{id}", get(handlers::get_area_status))
        .route("/api/v1/areas/{id}/result", get(handlers::get_area_result))
        .route("/api/v1/areas/{id}/tiles", get(handlers::list_area_tiles))
        .route("/api/v1/areas/{id}/hyperlocal", get(handlers::get_hyperlocal))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
