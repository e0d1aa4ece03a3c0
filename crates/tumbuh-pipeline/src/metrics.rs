//! Scalar metrics extracted from variable bags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tumbuh_core::config::LayeredConfig;
use tumbuh_core::error::Result;
use tumbuh_core::models::{Centroid, MetricPath, Tile, TileStatus, VariableBag};

/// Built-in metrics as (name, fallback paths)
const DEFAULT_METRICS: &[(&str, &[&str])] = &[
    (
        "precipitation_mm",
        &["seasonal.data.long_term_avg_precip_mm", "seasonal.long_term_avg_precip_mm"],
    ),
    ("temperature_c", &["climate.data.0.temp_mean_c", "climate.temp_mean_c"]),
    ("soil_ph", &["soil.properties_at_0_5cm.ph", "soil.ph"]),
    ("sand_g_kg", &["soil.properties_at_0_5cm.sand_g_kg", "soil.sand_g_kg"]),
    ("clay_g_kg", &["soil.properties_at_0_5cm.clay_g_kg", "soil.clay_g_kg"]),
    ("elevation_m", &["topography.data.elevation_meters", "topography.elevation_meters"]),
    ("slope_deg", &["topography.data.slope_degrees", "topography.slope_degrees"]),
    ("ndvi", &["landcover.vegetation_indices.ndvi"]),
    ("ndwi", &["landcover.vegetation_indices.ndwi"]),
    ("nighttime_radiance", &["nighttime.radiance"]),
];

/// A named metric and the paths tried, in order, to find it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    pub name: String,
    pub paths: Vec<MetricPath>,
}

/// Ordered set of metric definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCatalog {
    metrics: Vec<MetricDefinition>,
}

impl Default for MetricCatalog {
    fn default() -> Self {
        let metrics = DEFAULT_METRICS
            .iter()
            .map(|(name, paths)| MetricDefinition {
                name: (*name).to_string(),
                paths: paths.iter().filter_map(|p| p.parse().ok()).collect(),
            })
            .collect();
        Self { metrics }
    }
}

impl MetricCatalog {
    /// Build a catalog from `(name, paths)` pairs, failing on a malformed path
    pub fn from_definitions<I, P>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, P)>,
        P: IntoIterator<Item = String>,
    {
        let metrics = definitions
            .into_iter()
            .map(|(name, paths)| {
                let paths = paths.into_iter().map(|p| p.parse()).collect::<Result<Vec<_>>>()?;
                Ok(MetricDefinition { name, paths })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { metrics })
    }

    /// Built-in catalog with the `[metrics]` table of the configuration applied
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        Self::default().with_overrides(&config.metrics.value)
    }

    /// Replace the paths of named metrics, appending names not yet in the catalog
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        for (name, paths) in overrides {
            let paths = paths.iter().map(|p| p.parse()).collect::<Result<Vec<_>>>()?;
            match self.metrics.iter_mut().find(|m| &m.name == name) {
                Some(metric) => metric.paths = paths,
                None => self.metrics.push(MetricDefinition { name: name.clone(), paths }),
            }
        }
        Ok(self)
    }

    pub fn metrics(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    /// Metric values present in `bag`; the first path yielding a number wins
    pub fn extract(&self, bag: &VariableBag) -> BTreeMap<String, f64> {
        self.metrics
            .iter()
            .filter_map(|metric| {
                metric.paths.iter().find_map(|path| bag.lookup(path)).map(|v| (metric.name.clone(), v))
            })
            .collect()
    }

    /// Display view of a single tile
    pub fn tile_view(&self, tile: &Tile) -> TileMetricView {
        TileMetricView {
            row_index: tile.row_index,
            col_index: tile.col_index,
            centroid: tile.centroid,
            status: tile.status,
            metrics: self.extract(&tile.variables),
            recommendations: tile
                .recommendations
                .iter()
                .enumerate()
                .map(|(i, r)| RankedRecommendation {
                    rank: i + 1,
                    plant: r.plant.clone(),
                    confidence: r.confidence,
                    rationale: r.rationale.clone(),
                })
                .collect(),
            failure: tile.failure.clone(),
        }
    }
}

/// Recommendation with its 1-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendation {
    pub rank: usize,
    pub plant: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Per-tile metrics and ranked recommendations for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMetricView {
    pub row_index: usize,
    pub col_index: usize,
    pub centroid: Centroid,
    pub status: TileStatus,
    pub metrics: BTreeMap<String, f64>,
    pub recommendations: Vec<RankedRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}
