//! Area processing state machine.
//!
//! `PENDING → TILING → COLLECTING → ENRICHING → AGGREGATING → COMPLETE`, with
//! `FAILED` reachable from any in-flight stage. Every stage boundary is a
//! checkpoint written to the store; the final tile set, matrix, metadata and
//! `COMPLETE` status are committed together by `AreaStore::write_tiles`.

use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tumbuh_core::config::{validate_tile_size, PipelineConfig};
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{
    Area, AreaId, AreaResult, AreaStatus, AreaStatusView, Boundary, Centroid, NewArea,
    PageRequest, SubmitArea, TileCommit, TileFootprint,
};
use tumbuh_geo::{count_inside, parse_boundary, GridPlan, PolygonTiler};
use tumbuh_llm::ports::{Recommender, VariableProvider};
use tumbuh_store::ports::AreaStore;

use crate::aggregator::Aggregator;
use crate::collector::VariableCollector;
use crate::enricher::RecommendationEnricher;

/// Metadata key recording a recoverable enrichment failure
pub const ENRICHMENT_ERROR_KEY: &str = "enrichment_error";

/// Runs areas through tiling, collection, enrichment and aggregation
#[derive(Clone)]
pub struct PipelineOrchestrator {
    store: Arc<dyn AreaStore>,
    collector: VariableCollector,
    enricher: RecommendationEnricher,
    aggregator: Aggregator,
    config: PipelineConfig,
    active: Arc<Mutex<HashSet<AreaId>>>,
}

/// Registry entry for an in-flight run, released on drop
struct ActiveRun {
    id: AreaId,
    active: Arc<Mutex<HashSet<AreaId>>>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
    }
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn AreaStore>,
        variables: Arc<dyn VariableProvider>,
        recommender: Arc<dyn Recommender>,
        config: PipelineConfig,
    ) -> Self {
        let collector =
            VariableCollector::new(variables, config.workers).with_timeout(config.fetch_timeout);
        Self {
            store,
            collector,
            enricher: RecommendationEnricher::new(recommender),
            aggregator: Aggregator::default(),
            config,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replace the default aggregator (custom metric catalog)
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn store(&self) -> &Arc<dyn AreaStore> {
        &self.store
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate a request without touching the store
    ///
    /// Checks the tile size, normalizes the geometry and enforces the tile
    /// ceiling. The grid is only scanned when its raw cell count exceeds the
    /// ceiling, and never when it exceeds `max_grid_cells`.
    pub fn admit(&self, request: SubmitArea) -> Result<NewArea> {
        let tile_size = match request.tile_size_meters {
            Some(size) => validate_tile_size(size)?,
            None => self.config.default_tile_size,
        };
        let boundary = parse_boundary(&request.geometry)?;
        let bbox = boundary
            .bounding_box()
            .ok_or_else(|| TumbuhError::validation("geometry", "boundary has no vertices"))?;

        let plan = GridPlan::new(bbox, tile_size);
        let cells = plan.cell_count();
        if cells > self.config.max_tiles {
            if cells > self.config.max_grid_cells {
                return Err(TumbuhError::validation(
                    "geometry",
                    format!(
                        "area spans {} grid cells at {} m, more than the {} cell limit",
                        cells, tile_size, self.config.max_grid_cells
                    ),
                ));
            }
            let inside = count_inside(&boundary, &plan);
            if inside > self.config.max_tiles {
                return Err(TumbuhError::validation(
                    "geometry",
                    format!(
                        "area would produce {} tiles at {} m, more than the {} tile limit",
                        inside, tile_size, self.config.max_tiles
                    ),
                ));
            }
        }

        let name = request.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(NewArea { name, geometry: request.geometry, boundary, tile_size_meters: tile_size })
    }

    /// `admit` on the blocking pool, since parsing and the grid scan grow with the input
    async fn admit_blocking(&self, request: SubmitArea) -> Result<NewArea> {
        let orchestrator = self.clone();
        tokio::task::spawn_blocking(move || orchestrator.admit(request))
            .await
            .map_err(|e| TumbuhError::Pipeline(format!("admission task failed: {}", e)))?
    }

    /// Admit and persist an area, then process it in the background
    ///
    /// Returns as soon as the `PENDING` area exists.
    pub async fn submit(&self, request: SubmitArea) -> Result<AreaId> {
        let new_area = self.admit_blocking(request).await?;
        let id = self.store.create_area(new_area).await?;
        let guard = self.claim(id)?;

        tracing::info!(area_id = %id, "Area accepted");
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = orchestrator.run_claimed(id).await {
                tracing::debug!(area_id = %id, error = %e, "Background run ended with error");
            }
        });
        Ok(id)
    }

    /// Admit, persist and process an area to completion
    pub async fn process(&self, request: SubmitArea) -> Result<AreaId> {
        let new_area = self.admit_blocking(request).await?;
        let id = self.store.create_area(new_area).await?;
        self.run(id).await?;
        Ok(id)
    }

    /// Process a `PENDING` area, rejecting a second concurrent run
    pub async fn run(&self, id: AreaId) -> Result<()> {
        let _guard = self.claim(id)?;
        self.run_claimed(id).await
    }

    fn claim(&self, id: AreaId) -> Result<ActiveRun> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(id) {
            return Err(TumbuhError::AreaBusy { id });
        }
        Ok(ActiveRun { id, active: Arc::clone(&self.active) })
    }

    async fn run_claimed(&self, id: AreaId) -> Result<()> {
        let area = self.store.get_area(id).await?.ok_or(TumbuhError::AreaNotFound { id })?;
        if area.status != AreaStatus::Pending {
            return Err(TumbuhError::InvalidTransition {
                id,
                from: area.status,
                to: AreaStatus::Tiling,
            });
        }

        match self.execute(&area).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(area_id = %id, error = %e, "Area processing failed");
                if let Err(mark) =
                    self.store.update_area_status(id, AreaStatus::Failed, Some(e.to_string())).await
                {
                    tracing::error!(area_id = %id, error = %mark, "Could not mark area as failed");
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, area: &Area) -> Result<()> {
        let id = area.id;
        let started = Instant::now();

        self.checkpoint(id, AreaStatus::Tiling).await?;
        let (cells, matrix, plan) =
            tile_blocking(area.boundary.clone(), area.tile_size_meters).await?;
        tracing::info!(
            area_id = %id,
            rows = plan.rows,
            cols = plan.cols,
            tiles = cells.len(),
            tile_size_m = area.tile_size_meters,
            "Tiled area"
        );

        self.checkpoint(id, AreaStatus::Collecting).await?;
        let mut tiles = self.collector.collect(id, &cells).await;

        self.checkpoint(id, AreaStatus::Enriching).await?;
        let mut metadata = serde_json::Map::new();
        if let Err(e) = self.enricher.enrich(&mut tiles).await {
            tracing::warn!(area_id = %id, error = %e, "Enrichment failed, completing without recommendations");
            metadata.insert(ENRICHMENT_ERROR_KEY.to_string(), json!(e.to_string()));
        }

        self.checkpoint(id, AreaStatus::Aggregating).await?;
        let aggregate = self.aggregator.aggregate(&tiles, area.tile_size_meters, None);
        metadata.insert("grid".to_string(), json!({ "rows": plan.rows, "cols": plan.cols }));

        let processing_seconds = started.elapsed().as_secs_f64();
        self.store
            .write_tiles(id, TileCommit { tiles, matrix, processing_seconds, metadata })
            .await?;

        tracing::info!(
            area_id = %id,
            tiles = aggregate.tile_count,
            enriched = aggregate.status_counts.enriched,
            collection_failed = aggregate.status_counts.collection_failed,
            top_crop = aggregate.dominant_crops.first().map(|c| c.plant.as_str()).unwrap_or("-"),
            processing_seconds,
            "Area complete"
        );
        Ok(())
    }

    async fn checkpoint(&self, id: AreaId, status: AreaStatus) -> Result<()> {
        self.store.update_area_status(id, status, None).await?;
        tracing::debug!(area_id = %id, status = %status, "Area status changed");
        Ok(())
    }

    /// Current status of an area
    pub async fn status(&self, id: AreaId) -> Result<AreaStatusView> {
        let area = self.store.get_area(id).await?.ok_or(TumbuhError::AreaNotFound { id })?;
        Ok(area.status_view())
    }

    /// Area, tiles and freshly computed aggregates of a completed area
    pub async fn result(&self, id: AreaId) -> Result<AreaResult> {
        let area = self.store.get_area(id).await?.ok_or(TumbuhError::AreaNotFound { id })?;
        if area.status != AreaStatus::Complete {
            return Err(TumbuhError::AreaNotReady { id, status: area.status });
        }

        let tiles = self.store.get_tiles(id, PageRequest::all()).await?.items;
        let aggregates =
            self.aggregator.aggregate(&tiles, area.tile_size_meters, area.processing_seconds);
        Ok(AreaResult { area, tiles, aggregates })
    }
}

type TiledGrid = (Vec<TileFootprint>, Vec<Vec<Option<Centroid>>>, GridPlan);

/// Tile on the blocking pool; the scan is rows × cols point-in-polygon tests
async fn tile_blocking(boundary: Boundary, tile_size_meters: u32) -> Result<TiledGrid> {
    tokio::task::spawn_blocking(move || -> Result<TiledGrid> {
        let tiler = PolygonTiler::new(&boundary, tile_size_meters)?;
        Ok((tiler.tiles(), tiler.centroid_matrix(), *tiler.plan()))
    })
    .await
    .map_err(|e| TumbuhError::Pipeline(format!("tiling task failed: {}", e)))?
}
