//! Area-level aggregation over a tile set.

use std::collections::BTreeMap;
use tumbuh_core::models::{AreaAggregate, DominantCrop, Tile, TileStatus, TileStatusCounts};

use crate::metrics::MetricCatalog;

/// Computes dominant crops and environment means from persisted tile state
///
/// Pure: the same tiles always give the same aggregate.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    catalog: MetricCatalog,
}

impl Aggregator {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn aggregate(
        &self,
        tiles: &[Tile],
        tile_size_meters: u32,
        processing_seconds: Option<f64>,
    ) -> AreaAggregate {
        let tile_area_m2 = f64::from(tile_size_meters) * f64::from(tile_size_meters);

        AreaAggregate {
            tile_count: tiles.len(),
            dominant_crops: dominant_crops(tiles),
            environment_summary: self.environment_summary(tiles),
            status_counts: status_counts(tiles),
            approximate_hectares: tiles.len() as f64 * tile_area_m2 / 10_000.0,
            processing_seconds,
        }
    }

    /// Mean of every catalog metric over the tiles that reported it
    fn environment_summary(&self, tiles: &[Tile]) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for tile in tiles {
            for (name, value) in self.catalog.extract(&tile.variables) {
                let entry = sums.entry(name).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        sums.into_iter().map(|(name, (sum, count))| (name, sum / count as f64)).collect()
    }
}

/// Group tiles by their first-listed recommendation
///
/// Sorted by tile count, then average confidence, both descending, then plant name.
pub fn dominant_crops(tiles: &[Tile]) -> Vec<DominantCrop> {
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for top in tiles.iter().filter_map(Tile::top_recommendation) {
        let entry = groups.entry(top.plant.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += top.confidence;
    }

    let mut crops: Vec<DominantCrop> = groups
        .into_iter()
        .map(|(plant, (count, sum))| DominantCrop {
            plant: plant.to_string(),
            tile_count: count,
            average_confidence: sum / count as f64,
        })
        .collect();

    crops.sort_by(|a, b| {
        b.tile_count
            .cmp(&a.tile_count)
            .then_with(|| b.average_confidence.total_cmp(&a.average_confidence))
            .then_with(|| a.plant.cmp(&b.plant))
    });
    crops
}

fn status_counts(tiles: &[Tile]) -> TileStatusCounts {
    tiles.iter().fold(TileStatusCounts::default(), |mut counts, tile| {
        match tile.status {
            TileStatus::Collected => counts.collected += 1,
            TileStatus::Enriched => counts.enriched += 1,
            TileStatus::CollectionFailed => counts.collection_failed += 1,
        }
        counts
    })
}
