use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tumbuh_core::config::PipelineConfig;
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{
    Area, AreaId, AreaStatus, AreaSummary, Centroid, NewArea, Page, PageRequest, Recommendation,
    SubmitArea, Tile, TileCommit, TileStatus, VariableBag,
};
use tumbuh_geo::spatial::{meters_per_degree_lon, METERS_PER_DEGREE_LAT};
use tumbuh_llm::ports::{Recommender, VariableProvider};
use tumbuh_pipeline::PipelineOrchestrator;
use tumbuh_store::{AreaStore, MemoryAreaStore};

/// Memory store that records every status an area passes through
#[derive(Default)]
struct RecordingStore {
    inner: MemoryAreaStore,
    statuses: Mutex<Vec<AreaStatus>>,
    creates: Mutex<usize>,
}

impl RecordingStore {
    fn statuses(&self) -> Vec<AreaStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl AreaStore for RecordingStore {
    async fn create_area(&self, area: NewArea) -> Result<AreaId> {
        *self.creates.lock().unwrap() += 1;
        self.statuses.lock().unwrap().push(AreaStatus::Pending);
        self.inner.create_area(area).await
    }

    async fn update_area_status(
        &self,
        id: AreaId,
        status: AreaStatus,
        detail: Option<String>,
    ) -> Result<()> {
        self.inner.update_area_status(id, status, detail).await?;
        self.statuses.lock().unwrap().push(status);
        Ok(())
    }

    async fn write_tiles(&self, id: AreaId, commit: TileCommit) -> Result<()> {
        self.inner.write_tiles(id, commit).await?;
        self.statuses.lock().unwrap().push(AreaStatus::Complete);
        Ok(())
    }

    async fn update_area_metadata(
        &self,
        id: AreaId,
        metadata: serde_json::Map<String, Value>,
    ) -> Result<()> {
        self.inner.update_area_metadata(id, metadata).await
    }

    async fn get_area(&self, id: AreaId) -> Result<Option<Area>> {
        self.inner.get_area(id).await
    }

    async fn get_tiles(&self, id: AreaId, page: PageRequest) -> Result<Page<Tile>> {
        self.inner.get_tiles(id, page).await
    }

    async fn list_areas(&self) -> Result<Vec<AreaSummary>> {
        self.inner.list_areas().await
    }
}

/// Returns a small bag for every centroid
struct StubVariables;

#[async_trait]
impl VariableProvider for StubVariables {
    async fn fetch(&self, centroid: Centroid) -> Result<VariableBag> {
        let mut bag = VariableBag::new();
        bag.insert("seasonal", json!({"data": {"long_term_avg_precip_mm": 200.0}}));
        bag.insert("landcover", json!({"vegetation_indices": {"ndvi": 0.5, "lat": centroid.lat}}));
        Ok(bag)
    }
}

/// Rice everywhere, maize second
struct StubRecommender;

#[async_trait]
impl Recommender for StubRecommender {
    async fn recommend(&self, batch: &[VariableBag]) -> Result<Vec<Option<Vec<Recommendation>>>> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(batch
            .iter()
            .map(|_| Some(vec![Recommendation::new("maize", 0.6), Recommendation::new("rice", 0.9)]))
            .collect())
    }
}

struct FailingRecommender;

#[async_trait]
impl Recommender for FailingRecommender {
    async fn recommend(&self, _batch: &[VariableBag]) -> Result<Vec<Option<Vec<Recommendation>>>> {
        Err(TumbuhError::ProviderUnavailable {
            reason: "Gemini API error (503)".to_string(),
            remediation: "retry later".to_string(),
        })
    }
}

fn square_m(side_m: f64) -> Value {
    let lat = side_m / METERS_PER_DEGREE_LAT;
    let lon = side_m / meters_per_degree_lon(lat / 2.0);
    json!({
        "type": "Feature",
        "properties": {"name": "plot"},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [lon, 0.0], [lon, lat], [0.0, lat], [0.0, 0.0]]]
        }
    })
}

fn setup(recommender: Arc<dyn Recommender>) -> (Arc<RecordingStore>, PipelineOrchestrator) {
    let store = Arc::new(RecordingStore::default());
    let orchestrator = PipelineOrchestrator::new(
        store.clone(),
        Arc::new(StubVariables),
        recommender,
        PipelineConfig { workers: 2, ..PipelineConfig::default() },
    );
    (store, orchestrator)
}

fn submit(geometry: Value) -> SubmitArea {
    SubmitArea { name: Some("Demo plot".to_string()), geometry, tile_size_meters: Some(15) }
}

#[tokio::test]
async fn test_thirty_meter_square_completes_with_four_tiles() {
    let (store, orchestrator) = setup(Arc::new(StubRecommender));

    let id = orchestrator.process(submit(square_m(30.0))).await.unwrap();

    assert_eq!(
        store.statuses(),
        vec![
            AreaStatus::Pending,
            AreaStatus::Tiling,
            AreaStatus::Collecting,
            AreaStatus::Enriching,
            AreaStatus::Aggregating,
            AreaStatus::Complete,
        ]
    );

    let result = orchestrator.result(id).await.unwrap();
    assert_eq!(result.area.status, AreaStatus::Complete);
    assert!(result.area.processing_seconds.unwrap() > 0.0);
    assert_eq!(result.tiles.len(), 4);
    assert!(result.tiles.iter().all(|t| t.status == TileStatus::Enriched));

    // Recommendations are re-ranked by confidence
    assert_eq!(result.tiles[0].top_recommendation().unwrap().plant, "rice");
    assert_eq!(result.aggregates.dominant_crops.len(), 1);
    assert_eq!(result.aggregates.dominant_crops[0].tile_count, 4);
    assert_eq!(result.aggregates.environment_summary["precipitation_mm"], 200.0);
    assert_eq!(result.aggregates.processing_seconds, result.area.processing_seconds);

    let matrix_cells: usize = result.area.matrix.iter().map(|row| row.len()).sum();
    assert_eq!(matrix_cells, 4);
    assert_eq!(result.area.metadata["grid"], json!({"rows": 2, "cols": 2}));
}

#[tokio::test]
async fn test_enrichment_failure_still_completes() {
    let (store, orchestrator) = setup(Arc::new(FailingRecommender));

    let id = orchestrator.process(submit(square_m(30.0))).await.unwrap();

    assert_eq!(store.statuses().last(), Some(&AreaStatus::Complete));
    let result = orchestrator.result(id).await.unwrap();
    assert!(result.tiles.iter().all(|t| t.status == TileStatus::Collected));
    assert!(result.tiles.iter().all(|t| t.recommendations.is_empty()));
    assert!(result.aggregates.dominant_crops.is_empty());
    assert!(result.aggregates.environment_summary.contains_key("ndvi"));
    assert!(result.area.metadata["enrichment_error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_two_vertex_polygon_rejected_without_area() {
    let (store, orchestrator) = setup(Arc::new(StubRecommender));
    let line = json!({
        "type": "Polygon",
        "coordinates": [[[107.0, -6.0], [107.001, -6.0], [107.0, -6.0]]]
    });

    let err = orchestrator.process(submit(line)).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(*store.creates.lock().unwrap(), 0);
    assert!(store.list_areas().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_area_polygon_fails_at_tiling() {
    let (store, orchestrator) = setup(Arc::new(StubRecommender));
    let collinear = json!({
        "type": "Polygon",
        "coordinates": [[[107.0, -6.0], [107.001, -6.0], [107.002, -6.0], [107.0, -6.0]]]
    });

    let err = orchestrator.process(submit(collinear)).await.unwrap_err();
    assert!(matches!(err, TumbuhError::Tiling(_)));

    assert_eq!(
        store.statuses(),
        vec![AreaStatus::Pending, AreaStatus::Tiling, AreaStatus::Failed]
    );
    let areas = store.list_areas().await.unwrap();
    let area = store.get_area(areas[0].id).await.unwrap().unwrap();
    assert!(area.error_detail.unwrap().contains("zero area"));
}

#[tokio::test]
async fn test_submit_returns_before_processing_finishes() {
    let (_, orchestrator) = setup(Arc::new(StubRecommender));

    let id = orchestrator.submit(submit(square_m(30.0))).await.unwrap();

    let mut status = orchestrator.status(id).await.unwrap().status;
    for _ in 0..200 {
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        status = orchestrator.status(id).await.unwrap().status;
    }
    assert_eq!(status, AreaStatus::Complete);
}
