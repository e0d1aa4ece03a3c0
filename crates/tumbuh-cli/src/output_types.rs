use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;
use tumbuh_core::models::{AreaAggregate, AreaId, AreaStatus, TileFootprint};

/// Output for the tile command
#[derive(Debug, Serialize)]
pub struct TileOutput {
    pub tile_size_meters: u32,
    pub rows: usize,
    pub cols: usize,
    pub grid_cells: usize,
    pub tile_count: usize,
    pub approximate_hectares: f64,
    /// Area of the boundary itself, before snapping to tiles
    pub polygon_hectares: f64,
    pub tiles: Vec<TileFootprint>,
}

#[derive(Tabled)]
pub struct TileRow {
    #[tabled(rename = "Row")]
    pub row: usize,
    #[tabled(rename = "Col")]
    pub col: usize,
    #[tabled(rename = "Latitude")]
    pub lat: String,
    #[tabled(rename = "Longitude")]
    pub lon: String,
}

impl From<&TileFootprint> for TileRow {
    fn from(cell: &TileFootprint) -> Self {
        Self {
            row: cell.row,
            col: cell.col,
            lat: format!("{:.6}", cell.centroid.lat),
            lon: format!("{:.6}", cell.centroid.lon),
        }
    }
}

/// A configuration value and where it came from
#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: String,
}

/// Output for the config command
pub type ConfigOutput = BTreeMap<String, ConfigEntry>;

#[derive(Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

/// Output for the process command
#[derive(Debug, Serialize)]
pub struct ProcessOutput {
    pub area_id: AreaId,
    pub name: Option<String>,
    pub status: AreaStatus,
    pub processing_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<String>,
    pub aggregates: AreaAggregate,
}

#[derive(Tabled)]
pub struct CropRow {
    #[tabled(rename = "Plant")]
    pub plant: String,
    #[tabled(rename = "Tiles")]
    pub tiles: usize,
    #[tabled(rename = "Avg confidence")]
    pub confidence: String,
}

#[derive(Tabled)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Mean")]
    pub mean: String,
}
