use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Area-level statistics derived from the tile set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaAggregate {
    pub tile_count: usize,

    /// Ranked by tile count, then average confidence
    pub dominant_crops: Vec<DominantCrop>,

    /// Metric name to mean across tiles that reported it
    pub environment_summary: BTreeMap<String, f64>,

    pub status_counts: TileStatusCounts,

    pub approximate_hectares: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantCrop {
    pub plant: String,
    pub tile_count: usize,
    pub average_confidence: f64,
}

/// Number of tiles in each tile status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileStatusCounts {
    pub collected: usize,
    pub enriched: usize,
    pub collection_failed: usize,
}

impl TileStatusCounts {
    /// Whether any tile is missing variables or recommendations
    pub fn is_degraded(&self) -> bool {
        self.collected > 0 || self.collection_failed > 0
    }
}
