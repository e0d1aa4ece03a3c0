use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::area::AreaId;
use super::geometry::{BoundingBox, Centroid};
use super::recommendation::Recommendation;
use super::variables::VariableBag;
use crate::error::TumbuhError;

/// Per-tile outcome of collection and enrichment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileStatus {
    Collected,
    Enriched,
    CollectionFailed,
}

impl TileStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TileStatus::Collected => "COLLECTED",
            TileStatus::Enriched => "ENRICHED",
            TileStatus::CollectionFailed => "COLLECTION_FAILED",
        }
    }
}

impl fmt::Display for TileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileStatus {
    type Err = TumbuhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COLLECTED" => Ok(TileStatus::Collected),
            "ENRICHED" => Ok(TileStatus::Enriched),
            "COLLECTION_FAILED" => Ok(TileStatus::CollectionFailed),
            other => Err(TumbuhError::Serialization(format!("Unknown tile status: {}", other))),
        }
    }
}

/// A grid cell emitted by the tiler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileFootprint {
    pub row: usize,
    pub col: usize,
    /// Unclipped grid cell rectangle
    pub footprint: BoundingBox,
    pub centroid: Centroid,
}

/// A tile with its collected variables and recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub area_id: AreaId,
    pub row_index: usize,
    pub col_index: usize,
    pub footprint: BoundingBox,
    pub centroid: Centroid,
    #[serde(default)]
    pub variables: VariableBag,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    pub status: TileStatus,
    /// Retained cause of a collection failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Tile {
    /// Tile whose variables were fetched successfully
    pub fn collected(area_id: AreaId, cell: &TileFootprint, variables: VariableBag) -> Self {
        Self {
            area_id,
            row_index: cell.row,
            col_index: cell.col,
            footprint: cell.footprint,
            centroid: cell.centroid,
            variables,
            recommendations: Vec::new(),
            status: TileStatus::Collected,
            failure: None,
        }
    }

    /// Tile whose variable fetch failed
    pub fn failed(area_id: AreaId, cell: &TileFootprint, cause: impl Into<String>) -> Self {
        Self {
            area_id,
            row_index: cell.row,
            col_index: cell.col,
            footprint: cell.footprint,
            centroid: cell.centroid,
            variables: VariableBag::default(),
            recommendations: Vec::new(),
            status: TileStatus::CollectionFailed,
            failure: Some(cause.into()),
        }
    }

    pub fn is_collected(&self) -> bool {
        self.status != TileStatus::CollectionFailed
    }

    /// First-listed recommendation, if any
    pub fn top_recommendation(&self) -> Option<&Recommendation> {
        self.recommendations.first()
    }
}
