//! In-memory storage implementation for development and testing.
//!
//! This implementation uses `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For production workloads, use the PostgreSQL backend.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{
    Area, AreaId, AreaStatus, AreaSummary, NewArea, Page, PageRequest, Tile, TileCommit,
};

use crate::ports::AreaStore;

/// Areas and tiles live behind a single lock so the final commit is atomic
#[derive(Debug, Default)]
struct MemoryState {
    areas: HashMap<AreaId, Area>,
    tiles: HashMap<AreaId, Vec<Tile>>,
}

/// In-memory implementation of AreaStore
#[derive(Debug, Clone, Default)]
pub struct MemoryAreaStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryAreaStore {
    /// Create a new in-memory area store
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_transition(area: &Area, next: AreaStatus) -> Result<()> {
    if area.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(TumbuhError::InvalidTransition { id: area.id, from: area.status, to: next })
    }
}

#[async_trait]
impl AreaStore for MemoryAreaStore {
    async fn create_area(&self, area: NewArea) -> Result<AreaId> {
        let id = AreaId::new();
        let mut state = self.state.write().unwrap();
        state.areas.insert(id, Area::from_new(id, area));
        Ok(id)
    }

    async fn update_area_status(
        &self,
        id: AreaId,
        status: AreaStatus,
        detail: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let area = state.areas.get_mut(&id).ok_or(TumbuhError::AreaNotFound { id })?;
        check_transition(area, status)?;

        area.status = status;
        if status == AreaStatus::Failed {
            area.error_detail = detail;
        }
        area.updated_at = Utc::now();
        Ok(())
    }

    async fn write_tiles(&self, id: AreaId, commit: TileCommit) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let area = state.areas.get_mut(&id).ok_or(TumbuhError::AreaNotFound { id })?;
        check_transition(area, AreaStatus::Complete)?;

        area.status = AreaStatus::Complete;
        area.processing_seconds = Some(commit.processing_seconds);
        area.matrix = commit.matrix;
        area.metadata.extend(commit.metadata);
        area.updated_at = Utc::now();

        let mut tiles = commit.tiles;
        tiles.sort_by_key(|t| (t.row_index, t.col_index));
        state.tiles.insert(id, tiles);
        Ok(())
    }

    async fn update_area_metadata(
        &self,
        id: AreaId,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let area = state.areas.get_mut(&id).ok_or(TumbuhError::AreaNotFound { id })?;
        area.metadata.extend(metadata);
        area.updated_at = Utc::now();
        Ok(())
    }

    async fn get_area(&self, id: AreaId) -> Result<Option<Area>> {
        let state = self.state.read().unwrap();
        Ok(state.areas.get(&id).cloned())
    }

    async fn get_tiles(&self, id: AreaId, page: PageRequest) -> Result<Page<Tile>> {
        let state = self.state.read().unwrap();
        if !state.areas.contains_key(&id) {
            return Err(TumbuhError::AreaNotFound { id });
        }
        let tiles = state.tiles.get(&id).map(Vec::as_slice).unwrap_or_default();
        Ok(page.apply(tiles))
    }

    async fn list_areas(&self) -> Result<Vec<AreaSummary>> {
        let state = self.state.read().unwrap();
        let mut summaries: Vec<AreaSummary> = state
            .areas
            .values()
            .map(|area| AreaSummary {
                id: area.id,
                name: area.name.clone(),
                status: area.status,
                tile_size_meters: area.tile_size_meters,
                tile_count: state.tiles.get(&area.id).map(Vec::len).unwrap_or(0),
                processing_seconds: area.processing_seconds,
                created_at: area.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
