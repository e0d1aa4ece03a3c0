//! Bounded-parallel variable collection.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tumbuh_core::models::{AreaId, Centroid, Tile, TileFootprint, VariableBag};
use tumbuh_llm::ports::VariableProvider;

/// Fetches the variable bag of every tile with at most `workers` fetches in flight
///
/// A failing fetch only marks its own tile `COLLECTION_FAILED`; the stage never
/// fails as a whole and never retries.
#[derive(Clone)]
pub struct VariableCollector {
    provider: Arc<dyn VariableProvider>,
    workers: usize,
    timeout: Option<Duration>,
}

impl VariableCollector {
    pub fn new(provider: Arc<dyn VariableProvider>, workers: usize) -> Self {
        Self { provider, workers, timeout: None }
    }

    /// Abandon a single fetch after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Collect variables for `cells`, returning tiles in input order
    pub async fn collect(&self, area_id: AreaId, cells: &[TileFootprint]) -> Vec<Tile> {
        let started = Instant::now();
        let width = self.workers.min(cells.len()).max(1);

        let mut slots: Vec<Option<Tile>> = (0..cells.len()).map(|_| None).collect();
        let mut outcomes = stream::iter(cells.iter().map(|cell| cell.centroid).enumerate().collect::<Vec<_>>())
            .map(|(index, centroid)| async move { (index, self.fetch_one(centroid).await) })
            .buffer_unordered(width);

        while let Some((index, outcome)) = outcomes.next().await {
            let cell = &cells[index];
            slots[index] = Some(match outcome {
                Ok(variables) => Tile::collected(area_id, cell, variables),
                Err(cause) => {
                    tracing::warn!(
                        area_id = %area_id,
                        row = cell.row,
                        col = cell.col,
                        cause = %cause,
                        "Variable collection failed for tile"
                    );
                    Tile::failed(area_id, cell, cause)
                }
            });
        }

        let tiles: Vec<Tile> = slots.into_iter().flatten().collect();
        let failed = tiles.iter().filter(|t| !t.is_collected()).count();
        tracing::info!(
            area_id = %area_id,
            collected = tiles.len() - failed,
            failed,
            workers = width,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Variable collection finished"
        );
        tiles
    }

    async fn fetch_one(&self, centroid: Centroid) -> Result<VariableBag, String> {
        let started = Instant::now();
        let fetch = self.provider.fetch(centroid);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fetch).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("variable fetch timed out after {:.1}s", limit.as_secs_f64())),
            },
            None => fetch.await.map_err(|e| e.to_string()),
        };

        tracing::debug!(
            lat = centroid.lat,
            lon = centroid.lon,
            ok = outcome.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched tile variables"
        );
        outcome
    }
}
