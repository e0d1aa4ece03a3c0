use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::aggregate::AreaAggregate;
use super::geometry::{Boundary, Centroid};
use super::tile::Tile;
use crate::error::TumbuhError;

/// Unique identifier for an area of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub Uuid);

impl AreaId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AreaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AreaId {
    type Err = TumbuhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(AreaId)
            .map_err(|e| TumbuhError::validation("area_id", e.to_string()))
    }
}

/// Processing status of an area
///
/// Statuses advance monotonically in declaration order; any non-terminal
/// status may jump straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AreaStatus {
    Pending,
    Tiling,
    Collecting,
    Enriching,
    Aggregating,
    Complete,
    Failed,
}

impl AreaStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AreaStatus::Pending => "PENDING",
            AreaStatus::Tiling => "TILING",
            AreaStatus::Collecting => "COLLECTING",
            AreaStatus::Enriching => "ENRICHING",
            AreaStatus::Aggregating => "AGGREGATING",
            AreaStatus::Complete => "COMPLETE",
            AreaStatus::Failed => "FAILED",
        }
    }

    const fn stage(&self) -> u8 {
        match self {
            AreaStatus::Pending => 0,
            AreaStatus::Tiling => 1,
            AreaStatus::Collecting => 2,
            AreaStatus::Enriching => 3,
            AreaStatus::Aggregating => 4,
            AreaStatus::Complete => 5,
            AreaStatus::Failed => 6,
        }
    }

    /// `Complete` and `Failed` accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, AreaStatus::Complete | AreaStatus::Failed)
    }

    /// Whether moving from `self` to `next` respects the state machine
    pub fn can_transition_to(&self, next: AreaStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            AreaStatus::Failed => true,
            _ => next.stage() == self.stage() + 1,
        }
    }
}

impl fmt::Display for AreaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaStatus {
    type Err = TumbuhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(AreaStatus::Pending),
            "TILING" => Ok(AreaStatus::Tiling),
            "COLLECTING" => Ok(AreaStatus::Collecting),
            "ENRICHING" => Ok(AreaStatus::Enriching),
            "AGGREGATING" => Ok(AreaStatus::Aggregating),
            "COMPLETE" => Ok(AreaStatus::Complete),
            "FAILED" => Ok(AreaStatus::Failed),
            other => Err(TumbuhError::Serialization(format!("Unknown area status: {}", other))),
        }
    }
}

/// An area of interest and its processing state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,

    pub name: Option<String>,

    /// GeoJSON exactly as submitted by the caller
    pub geometry: serde_json::Value,

    /// Normalized exterior ring used for tiling
    pub boundary: Boundary,

    pub tile_size_meters: u32,

    pub status: AreaStatus,

    /// Centroid matrix (`rows × cols`), `None` for cells outside the boundary
    pub matrix: Vec<Vec<Option<Centroid>>>,

    /// Free-form metadata (enrichment warnings, cached insights)
    pub metadata: serde_json::Map<String, serde_json::Value>,

    pub processing_seconds: Option<f64>,

    pub error_detail: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Area {
    /// Build a `Pending` area from an admitted request
    pub fn from_new(id: AreaId, new_area: NewArea) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: new_area.name,
            geometry: new_area.geometry,
            boundary: new_area.boundary,
            tile_size_meters: new_area.tile_size_meters,
            status: AreaStatus::Pending,
            matrix: Vec::new(),
            metadata: serde_json::Map::new(),
            processing_seconds: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status view exposed to pollers
    pub fn status_view(&self) -> AreaStatusView {
        AreaStatusView {
            id: self.id,
            status: self.status,
            processing_seconds: self.processing_seconds,
            error_detail: self.error_detail.clone(),
        }
    }

    /// Display name, falling back to a generic label
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed")
    }
}

/// An admitted area ready to be persisted
#[derive(Debug, Clone)]
pub struct NewArea {
    pub name: Option<String>,
    pub geometry: serde_json::Value,
    pub boundary: Boundary,
    pub tile_size_meters: u32,
}

/// Compact listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaSummary {
    pub id: AreaId,
    pub name: Option<String>,
    pub status: AreaStatus,
    pub tile_size_meters: u32,
    pub tile_count: usize,
    pub processing_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Final atomic write of a processing run
#[derive(Debug, Clone)]
pub struct TileCommit {
    pub tiles: Vec<Tile>,
    pub matrix: Vec<Vec<Option<Centroid>>>,
    pub processing_seconds: f64,
    /// Metadata entries merged into the area's metadata
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Caller request to process a new area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitArea {
    #[serde(default)]
    pub name: Option<String>,

    /// GeoJSON Polygon, MultiPolygon, Feature or FeatureCollection
    pub geometry: serde_json::Value,

    /// Tile edge length in meters, the configured default when omitted
    #[serde(default, alias = "tile_size")]
    pub tile_size_meters: Option<i64>,
}

/// Status poll response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaStatusView {
    pub id: AreaId,
    pub status: AreaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Completed result response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaResult {
    pub area: Area,
    pub tiles: Vec<Tile>,
    pub aggregates: AreaAggregate,
}
