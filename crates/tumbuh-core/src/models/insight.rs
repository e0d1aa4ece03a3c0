//! Hyperlocal insight payloads cached on completed areas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::area::AreaId;
use super::geometry::BoundingBox;

/// Compass bounds of an area with its center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub center_lat: f64,
    pub center_lon: f64,
}

impl From<BoundingBox> for Bounds {
    fn from(bbox: BoundingBox) -> Self {
        let center = bbox.center();
        Self {
            north: bbox.max_lat,
            south: bbox.min_lat,
            east: bbox.max_lon,
            west: bbox.min_lon,
            center_lat: center.lat,
            center_lon: center.lon,
        }
    }
}

/// What the insight provider is told about an area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightContext {
    pub area_id: AreaId,
    pub area_name: String,
    pub bounds: Option<Bounds>,
    pub primary_crops: Vec<String>,
}

/// A single sourced insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightItem {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub source_name: Option<String>,
    pub source_url: String,
}

/// Insights plus the context they were generated for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperlocalPayload {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<InsightItem>,
    pub context: InsightContext,
}
