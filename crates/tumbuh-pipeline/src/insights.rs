//! Hyperlocal insights for completed areas.
//!
//! Insights are generated once per insight context and cached in the area's
//! metadata under `hyperlocal`. A changed context (new name, different
//! dominant crops) or an explicit refresh regenerates them.

use chrono::Utc;
use std::sync::Arc;
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{
    Area, AreaId, AreaStatus, BoundingBox, Bounds, HyperlocalPayload, InsightContext, PageRequest,
    Tile,
};
use tumbuh_geo::parse_boundary;
use tumbuh_llm::ports::InsightProvider;
use tumbuh_store::ports::AreaStore;

use crate::aggregator::dominant_crops;

/// Metadata key holding the cached payload
pub const HYPERLOCAL_KEY: &str = "hyperlocal";

const MAX_PRIMARY_CROPS: usize = 5;

/// Generates and caches hyperlocal insights
#[derive(Clone)]
pub struct HyperlocalService {
    store: Arc<dyn AreaStore>,
    provider: Arc<dyn InsightProvider>,
}

impl HyperlocalService {
    pub fn new(store: Arc<dyn AreaStore>, provider: Arc<dyn InsightProvider>) -> Self {
        Self { store, provider }
    }

    /// Insights for a completed area, from cache unless `refresh` is set
    pub async fn insights(&self, id: AreaId, refresh: bool) -> Result<HyperlocalPayload> {
        let area = self.store.get_area(id).await?.ok_or(TumbuhError::AreaNotFound { id })?;
        if area.status != AreaStatus::Complete {
            return Err(TumbuhError::AreaNotReady { id, status: area.status });
        }

        let tiles = self.store.get_tiles(id, PageRequest::all()).await?.items;
        let context = build_context(&area, &tiles);

        if !refresh {
            if let Some(cached) = cached_payload(&area) {
                if cached.context == context {
                    tracing::debug!(area_id = %id, "Serving cached hyperlocal insights");
                    return Ok(cached);
                }
            }
        }

        let items = match &context.bounds {
            Some(bounds) => match self.provider.insights(bounds, &context).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(area_id = %id, error = %e, "Hyperlocal insight generation failed");
                    Vec::new()
                }
            },
            None => {
                tracing::warn!(area_id = %id, "No bounds available for hyperlocal insights");
                Vec::new()
            }
        };

        let payload = HyperlocalPayload { generated_at: Utc::now(), items, context };
        if !payload.items.is_empty() {
            let mut metadata = serde_json::Map::new();
            metadata.insert(HYPERLOCAL_KEY.to_string(), serde_json::to_value(&payload)?);
            self.store.update_area_metadata(id, metadata).await?;
            tracing::info!(area_id = %id, items = payload.items.len(), "Cached hyperlocal insights");
        }
        Ok(payload)
    }
}

fn cached_payload(area: &Area) -> Option<HyperlocalPayload> {
    let value = area.metadata.get(HYPERLOCAL_KEY)?;
    match serde_json::from_value(value.clone()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!(area_id = %area.id, error = %e, "Ignoring unreadable hyperlocal cache");
            None
        }
    }
}

/// Insight context of an area: name, bounds and up to five primary crops
pub fn build_context(area: &Area, tiles: &[Tile]) -> InsightContext {
    let primary_crops = dominant_crops(tiles)
        .into_iter()
        .map(|crop| crop.plant)
        .filter(|plant| !is_unknown_plant(plant))
        .take(MAX_PRIMARY_CROPS)
        .collect();

    InsightContext {
        area_id: area.id,
        area_name: area.display_name().to_string(),
        bounds: area_bounds(area, tiles),
        primary_crops,
    }
}

fn is_unknown_plant(plant: &str) -> bool {
    let plant = plant.trim();
    plant.is_empty() || plant.eq_ignore_ascii_case("unknown")
}

/// Bounds from the submitted geometry, else the centroid matrix, else the tile footprints
pub fn area_bounds(area: &Area, tiles: &[Tile]) -> Option<Bounds> {
    parse_boundary(&area.geometry)
        .ok()
        .and_then(|boundary| boundary.bounding_box())
        .or_else(|| {
            let centroids = area.matrix.iter().flatten().flatten();
            envelope(centroids.map(|c| (c.lat, c.lon)))
        })
        .or_else(|| {
            envelope(tiles.iter().flat_map(|t| {
                [
                    (t.footprint.min_lat, t.footprint.min_lon),
                    (t.footprint.max_lat, t.footprint.max_lon),
                ]
            }))
        })
        .map(Bounds::from)
}

fn envelope(points: impl Iterator<Item = (f64, f64)>) -> Option<BoundingBox> {
    points.fold(None, |acc, (lat, lon)| {
        Some(match acc {
            None => BoundingBox::new(lat, lon, lat, lon),
            Some(b) => BoundingBox::new(
                b.min_lat.min(lat),
                b.min_lon.min(lon),
                b.max_lat.max(lat),
                b.max_lon.max(lon),
            ),
        })
    })
}
