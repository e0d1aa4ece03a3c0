//! Batched crop recommendation enrichment.

use std::sync::Arc;
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{rank_recommendations, Tile, TileStatus, VariableBag};
use tumbuh_llm::ports::Recommender;

/// Outcome of a successful enrichment call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Tiles sent to the provider
    pub requested: usize,
    /// Tiles that received a non-empty recommendation list
    pub enriched: usize,
}

/// Sends every collected tile of an area to the recommender in one batch
#[derive(Clone)]
pub struct RecommendationEnricher {
    recommender: Arc<dyn Recommender>,
}

impl RecommendationEnricher {
    pub fn new(recommender: Arc<dyn Recommender>) -> Self {
        Self { recommender }
    }

    /// Attach recommendations to `tiles` in place
    ///
    /// Batch position `i` always refers to the `i`-th collected tile. When the
    /// provider call fails the tiles are left untouched and the error is
    /// returned as `TumbuhError::Enrichment`, which callers treat as recoverable.
    pub async fn enrich(&self, tiles: &mut [Tile]) -> Result<EnrichmentSummary> {
        let positions: Vec<usize> =
            tiles.iter().enumerate().filter(|(_, t)| t.is_collected()).map(|(i, _)| i).collect();
        if positions.is_empty() {
            tracing::debug!("No collected tiles, skipping enrichment");
            return Ok(EnrichmentSummary::default());
        }

        let batch: Vec<VariableBag> = positions.iter().map(|&i| tiles[i].variables.clone()).collect();
        let slots = self.recommender.recommend(&batch).await.map_err(|e| match e {
            TumbuhError::Enrichment(_) => e,
            other => TumbuhError::Enrichment(other.to_string()),
        })?;

        if slots.len() != positions.len() {
            tracing::warn!(
                expected = positions.len(),
                received = slots.len(),
                "Recommendation batch length mismatch"
            );
        }

        let mut summary = EnrichmentSummary { requested: positions.len(), enriched: 0 };
        for (&position, slot) in positions.iter().zip(slots) {
            let Some(list) = slot else { continue };
            let ranked = rank_recommendations(list);
            if ranked.is_empty() {
                continue;
            }
            let tile = &mut tiles[position];
            tile.recommendations = ranked;
            tile.status = TileStatus::Enriched;
            summary.enriched += 1;
        }

        tracing::info!(
            requested = summary.requested,
            enriched = summary.enriched,
            "Recommendation enrichment finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tumbuh_core::models::{AreaId, BoundingBox, Centroid, Recommendation, TileFootprint};

    /// Replays canned slots and records the batch it was given
    struct ScriptedRecommender {
        slots: Result<Vec<Option<Vec<Recommendation>>>>,
        seen: Mutex<Vec<usize>>,
    }

    impl ScriptedRecommender {
        fn new(slots: Result<Vec<Option<Vec<Recommendation>>>>) -> Self {
            Self { slots, seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Recommender for ScriptedRecommender {
        async fn recommend(&self, batch: &[VariableBag]) -> Result<Vec<Option<Vec<Recommendation>>>> {
            self.seen.lock().unwrap().push(batch.len());
            match &self.slots {
                Ok(slots) => Ok(slots.clone()),
                Err(e) => Err(TumbuhError::ProviderUnavailable {
                    reason: e.to_string(),
                    remediation: "retry later".to_string(),
                }),
            }
        }
    }

    fn tiles(n: usize) -> Vec<Tile> {
        (0..n)
            .map(|i| {
                let cell = TileFootprint {
                    row: 0,
                    col: i,
                    footprint: BoundingBox::new(0.0, i as f64, 1.0, i as f64 + 1.0),
                    centroid: Centroid::new(0.5, i as f64 + 0.5),
                };
                let mut bag = VariableBag::new();
                bag.insert("soil", json!({"ph": 6.0 + i as f64}));
                Tile::collected(AreaId::new(), &cell, bag)
            })
            .collect()
    }

    fn one(plant: &str, confidence: f64) -> Option<Vec<Recommendation>> {
        Some(vec![Recommendation::new(plant, confidence)])
    }

    #[tokio::test]
    async fn test_missing_slot_leaves_only_that_tile_unenriched() {
        let recommender = Arc::new(ScriptedRecommender::new(Ok(vec![
            one("rice", 0.9),
            None,
            one("cassava", 0.6),
        ])));
        let enricher = RecommendationEnricher::new(recommender);
        let mut tiles = tiles(3);

        let summary = enricher.enrich(&mut tiles).await.unwrap();
        assert_eq!(summary, EnrichmentSummary { requested: 3, enriched: 2 });
        assert_eq!(tiles[0].top_recommendation().unwrap().plant, "rice");
        assert!(tiles[1].recommendations.is_empty());
        assert_eq!(tiles[1].status, TileStatus::Collected);
        assert_eq!(tiles[2].top_recommendation().unwrap().plant, "cassava");
    }

    #[tokio::test]
    async fn test_failed_tiles_excluded_from_batch() {
        let recommender = Arc::new(ScriptedRecommender::new(Ok(vec![
            one("maize", 0.8),
            one("taro", 0.5),
        ])));
        let enricher = RecommendationEnricher::new(recommender.clone());
        let mut tiles = tiles(3);
        let cell = TileFootprint {
            row: 0,
            col: 0,
            footprint: tiles[0].footprint,
            centroid: tiles[0].centroid,
        };
        tiles[0] = Tile::failed(tiles[0].area_id, &cell, "timeout");

        enricher.enrich(&mut tiles).await.unwrap();
        assert_eq!(*recommender.seen.lock().unwrap(), vec![2]);
        assert_eq!(tiles[0].status, TileStatus::CollectionFailed);
        assert_eq!(tiles[1].top_recommendation().unwrap().plant, "maize");
        assert_eq!(tiles[2].top_recommendation().unwrap().plant, "taro");
    }

    #[tokio::test]
    async fn test_provider_failure_is_recoverable() {
        let recommender = Arc::new(ScriptedRecommender::new(Err(TumbuhError::Pipeline(
            "quota exhausted".to_string(),
        ))));
        let enricher = RecommendationEnricher::new(recommender);
        let mut tiles = tiles(2);

        let err = enricher.enrich(&mut tiles).await.unwrap_err();
        assert!(matches!(err, TumbuhError::Enrichment(_)));
        assert!(!err.is_fatal());
        assert!(tiles.iter().all(|t| t.status == TileStatus::Collected));
    }

    #[tokio::test]
    async fn test_lists_are_ranked_and_empty_lists_ignored() {
        let recommender = Arc::new(ScriptedRecommender::new(Ok(vec![
            Some(vec![
                Recommendation::new("chili", 0.3),
                Recommendation::new("rice", 0.9),
                Recommendation::new("corn", 0.9),
            ]),
            Some(Vec::new()),
        ])));
        let enricher = RecommendationEnricher::new(recommender);
        let mut tiles = tiles(2);

        let summary = enricher.enrich(&mut tiles).await.unwrap();
        assert_eq!(summary.enriched, 1);
        let plants: Vec<&str> = tiles[0].recommendations.iter().map(|r| r.plant.as_str()).collect();
        assert_eq!(plants, vec!["rice", "corn", "chili"]);
        assert_eq!(tiles[1].status, TileStatus::Collected);
    }

    #[tokio::test]
    async fn test_no_collected_tiles_skips_provider() {
        let recommender = Arc::new(ScriptedRecommender::new(Ok(Vec::new())));
        let enricher = RecommendationEnricher::new(recommender.clone());

        let summary = enricher.enrich(&mut []).await.unwrap();
        assert_eq!(summary, EnrichmentSummary::default());
        assert!(recommender.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_response_tolerated() {
        let recommender = Arc::new(ScriptedRecommender::new(Ok(vec![one("rice", 0.7)])));
        let enricher = RecommendationEnricher::new(recommender);
        let mut tiles = tiles(3);

        let summary = enricher.enrich(&mut tiles).await.unwrap();
        assert_eq!(summary.enriched, 1);
        assert_eq!(tiles[2].status, TileStatus::Collected);
    }
}
