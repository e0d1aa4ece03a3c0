//! Tumbuh Pipeline - Area processing stages and orchestration
//!
//! This crate implements the processing use cases: variable collection,
//! recommendation enrichment, aggregation and hyperlocal insights, driven by
//! the area state machine in [`PipelineOrchestrator`].

pub mod aggregator;
pub mod collector;
pub mod enricher;
pub mod insights;
pub mod metrics;
pub mod orchestrator;

pub use aggregator::{dominant_crops, Aggregator};
pub use collector::VariableCollector;
pub use enricher::{EnrichmentSummary, RecommendationEnricher};
pub use insights::HyperlocalService;
pub use metrics::{MetricCatalog, MetricDefinition, RankedRecommendation, TileMetricView};
pub use orchestrator::PipelineOrchestrator;
