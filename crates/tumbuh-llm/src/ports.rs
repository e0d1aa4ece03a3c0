//! Provider port definitions

use async_trait::async_trait;
use tumbuh_core::error::Result;
use tumbuh_core::models::{Bounds, Centroid, InsightContext, InsightItem, Recommendation, VariableBag};

/// Port for the environmental variable provider
#[async_trait]
pub trait VariableProvider: Send + Sync {
    /// Fetch the variable bag for one tile centroid
    async fn fetch(&self, centroid: Centroid) -> Result<VariableBag>;
}

/// Port for the crop recommendation provider
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Recommend crops for a batch of variable bags
    ///
    /// # Returns
    /// One optional list per input position. `None` means the provider gave
    /// nothing usable for that position. The call fails only when the whole
    /// batch failed.
    async fn recommend(&self, batch: &[VariableBag]) -> Result<Vec<Option<Vec<Recommendation>>>>;
}

/// Port for hyperlocal insight generation
#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// Produce sourced insights for an area
    async fn insights(&self, bounds: &Bounds, context: &InsightContext) -> Result<Vec<InsightItem>>;
}
