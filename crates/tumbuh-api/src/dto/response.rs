use serde::Serialize;
use tumbuh_core::models::{AreaId, AreaStatus};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self { status: "ok".to_string(), version: env!("CARGO_PKG_VERSION").to_string() }
    }
}

/// Accepted submission
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub area_id: AreaId,
    pub status: AreaStatus,
}
