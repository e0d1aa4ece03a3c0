use serde::{Deserialize, Serialize};

/// Maximum number of recommendations kept per tile
pub const MAX_RECOMMENDATIONS: usize = 5;

/// A ranked crop recommendation for one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub plant: String,

    /// Confidence in `[0, 1]`
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Recommendation {
    pub fn new(plant: impl Into<String>, confidence: f64) -> Self {
        Self { plant: plant.into(), confidence, rationale: None }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Normalize a provider list: clamp confidences, order highest first and keep the top entries.
///
/// The sort is stable so equal confidences keep provider order.
pub fn rank_recommendations(mut items: Vec<Recommendation>) -> Vec<Recommendation> {
    for item in &mut items {
        item.confidence = item.confidence.clamp(0.0, 1.0);
    }
    items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    items.truncate(MAX_RECOMMENDATIONS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_sorts_and_truncates() {
        let items = vec![
            Recommendation::new("cassava", 0.3),
            Recommendation::new("rice", 0.9),
            Recommendation::new("maize", 0.6),
            Recommendation::new("chili", 0.5),
            Recommendation::new("peanut", 0.4),
            Recommendation::new("soybean", 0.2),
        ];
        let ranked = rank_recommendations(items);
        assert_eq!(ranked.len(), MAX_RECOMMENDATIONS);
        assert_eq!(ranked[0].plant, "rice");
        assert_eq!(ranked[4].plant, "cassava");
    }

    #[test]
    fn test_rank_ties_keep_provider_order() {
        let ranked = rank_recommendations(vec![
            Recommendation::new("banana", 0.7),
            Recommendation::new("coffee", 0.7),
        ]);
        assert_eq!(ranked[0].plant, "banana");
        assert_eq!(ranked[1].plant, "coffee");
    }

    #[test]
    fn test_rank_clamps_confidence() {
        let ranked = rank_recommendations(vec![
            Recommendation::new("rice", 1.4),
            Recommendation::new("maize", -0.2),
        ]);
        assert_eq!(ranked[0].confidence, 1.0);
        assert_eq!(ranked[1].confidence, 0.0);
    }
}
