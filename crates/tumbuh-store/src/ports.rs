use async_trait::async_trait;
use tumbuh_core::error::Result;
use tumbuh_core::models::{
    Area, AreaId, AreaStatus, AreaSummary, NewArea, Page, PageRequest, Tile, TileCommit,
};

/// Port for area and tile persistence
///
/// Every status change is validated against the area state machine; an
/// illegal move fails with `InvalidTransition` and leaves the area untouched.
#[async_trait]
pub trait AreaStore: Send + Sync {
    /// Persist a new `PENDING` area
    async fn create_area(&self, area: NewArea) -> Result<AreaId>;

    /// Move an area to `status`, recording `detail` as the error detail for `FAILED`
    async fn update_area_status(
        &self,
        id: AreaId,
        status: AreaStatus,
        detail: Option<String>,
    ) -> Result<()>;

    /// Final atomic commit of a run
    ///
    /// Replaces the tile set, stores the centroid matrix, merges metadata,
    /// records the processing time and moves the area to `COMPLETE`, all or
    /// nothing.
    async fn write_tiles(&self, id: AreaId, commit: TileCommit) -> Result<()>;

    /// Merge entries into the area's metadata
    async fn update_area_metadata(
        &self,
        id: AreaId,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<()>;

    /// Retrieve an area by ID
    async fn get_area(&self, id: AreaId) -> Result<Option<Area>>;

    /// Tiles of an area in row-major order
    async fn get_tiles(&self, id: AreaId, page: PageRequest) -> Result<Page<Tile>>;

    /// List all areas, newest first
    async fn list_areas(&self) -> Result<Vec<AreaSummary>>;
}
