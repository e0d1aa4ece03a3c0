use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use tumbuh_core::config::PipelineConfig;
use tumbuh_core::error::Result;
use tumbuh_core::models::{
    Bounds, Centroid, InsightContext, InsightItem, Recommendation, VariableBag,
};
use tumbuh_llm::ports::{InsightProvider, Recommender, VariableProvider};
use tumbuh_pipeline::{HyperlocalService, PipelineOrchestrator};
use tumbuh_store::MemoryAreaStore;

use tumbuh_api::{create_router, AppState};

struct StubVariables;

#[async_trait]
impl VariableProvider for StubVariables {
    async fn fetch(&self, _centroid: Centroid) -> Result<VariableBag> {
        let mut bag = VariableBag::new();
        bag.insert("soil", json!({"properties_at_0_5cm": {"ph": 6.1}}));
        Ok(bag)
    }
}

struct StubRecommender;

#[async_trait]
impl Recommender for StubRecommender {
    async fn recommend(&self, batch: &[VariableBag]) -> Result<Vec<Option<Vec<Recommendation>>>> {
        Ok(batch.iter().map(|_| Some(vec![Recommendation::new("rice", 0.8)])).collect())
    }
}

struct StubInsights;

#[async_trait]
impl InsightProvider for StubInsights {
    async fn insights(&self, _bounds: &Bounds, context: &InsightContext) -> Result<Vec<InsightItem>> {
        Ok(vec![InsightItem {
            title: format!("Planting window for {}", context.area_name),
            summary: "Rains expected next week".to_string(),
            source_name: Some("BMKG".to_string()),
            source_url: "https://example.org/bmkg".to_string(),
        }])
    }
}

fn app() -> (Router, MemoryAreaStore) {
    let store = MemoryAreaStore::new();
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(StubVariables),
        Arc::new(StubRecommender),
        PipelineConfig { workers: 2, ..PipelineConfig::default() },
    );
    let hyperlocal = HyperlocalService::new(Arc::new(store.clone()), Arc::new(StubInsights));
    (create_router(Arc::new(AppState::new(orchestrator, hyperlocal))), store)
}

fn square() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[107.0, -6.0], [107.001, -6.0], [107.001, -5.999], [107.0, -5.999], [107.0, -6.0]]]
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn wait_for_complete(app: &Router, id: &str) {
    for _ in 0..300 {
        let (_, body) = send(app, "GET", &format!("/api/v1/areas/{}", id), None).await;
        if body["status"] == "COMPLETE" {
            return;
        }
        assert_ne!(body["status"], "FAILED", "area failed: {}", body);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("area {} did not complete", id);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_submit_poll_and_read_result() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/areas",
        Some(json!({"name": "Sawah", "geometry": square(), "tile_size_meters": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["area_id"].as_str().unwrap().to_string();

    wait_for_complete(&app, &id).await;

    let (status, result) = send(&app, "GET", &format!("/api/v1/areas/{}/result", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let tile_count = result["tiles"].as_array().unwrap().len();
    assert!(tile_count > 0);
    assert_eq!(result["aggregates"]["dominant_crops"][0]["plant"], "rice");

    let (status, page) =
        send(&app, "GET", &format!("/api/v1/areas/{}/tiles?page=1&per_page=1", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["total"], tile_count);
    assert_eq!(page["items"][0]["metrics"]["soil_ph"], 6.1);
    assert_eq!(page["items"][0]["recommendations"][0]["rank"], 1);

    let (status, insights) =
        send(&app, "GET", &format!("/api/v1/areas/{}/hyperlocal", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(insights["items"][0]["title"], "Planting window for Sawah");
    assert_eq!(insights["context"]["primary_crops"], json!(["rice"]));

    let (_, listing) = send(&app, "GET", "/api/v1/areas", None).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_tile_size_is_bad_request() {
    let (app, store) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/areas",
        Some(json!({"geometry": square(), "tile_size_meters": 3})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("tile_size_meters"));
    use tumbuh_store::AreaStore;
    assert!(store.list_areas().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let (app, _) = app();

    let (status, _) =
        send(&app, "GET", "/api/v1/areas/00000000-0000-0000-0000-000000000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/v1/areas/not-a-uuid/result", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/areas/00000000-0000-0000-0000-000000000000/tiles",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_result_of_pending_area_is_conflict() {
    use tumbuh_core::models::NewArea;
    use tumbuh_geo::parse_boundary;
    use tumbuh_store::AreaStore;

    let (app, store) = app();
    let geometry = square();
    let boundary = parse_boundary(&geometry).unwrap();
    let id = store
        .create_area(NewArea { name: None, geometry, boundary, tile_size_meters: 15 })
        .await
        .unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/v1/areas/{}/result", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["details"].as_str().unwrap().contains("PENDING"));

    let (status, _) = send(&app, "GET", &format!("/api/v1/areas/{}/hyperlocal", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
