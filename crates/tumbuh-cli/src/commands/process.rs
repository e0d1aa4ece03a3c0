use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tumbuh_core::config::LayeredConfig;
use tumbuh_core::models::SubmitArea;
use tumbuh_llm::Providers;
use tumbuh_pipeline::orchestrator::ENRICHMENT_ERROR_KEY;
use tumbuh_pipeline::{Aggregator, MetricCatalog, PipelineOrchestrator};
use tumbuh_store::MemoryAreaStore;

use crate::cli::ProcessArgs;
use crate::config_loader::read_geojson;
use crate::output::OutputWriter;
use crate::output_types::{CropRow, MetricRow, ProcessOutput};

/// Run the full pipeline with the in-memory store and print the aggregate
pub async fn execute(args: ProcessArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let geometry = read_geojson(&args.path)?;

    let api_key = env::var("GOOGLE_API_KEY").unwrap_or_default();
    let providers = Providers::from_config(config, &api_key)
        .context("GOOGLE_API_KEY must be set to run the pipeline")?;

    let catalog = MetricCatalog::from_config(config).context("Invalid [metrics] table")?;
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(MemoryAreaStore::new()),
        providers.variables,
        providers.recommender,
        config.pipeline_config(),
    )
    .with_aggregator(Aggregator::new(catalog));

    let name = args.name.or_else(|| {
        args.path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
    });
    let request = SubmitArea { name, geometry, tile_size_meters: args.tile_size };

    output.info(format!("Processing {}", args.path.display()));
    let id = orchestrator.process(request).await?;
    let result = orchestrator.result(id).await?;

    let process_output = ProcessOutput {
        area_id: result.area.id,
        name: result.area.name.clone(),
        status: result.area.status,
        processing_seconds: result.area.processing_seconds,
        enrichment_error: result
            .area
            .metadata
            .get(ENRICHMENT_ERROR_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string),
        aggregates: result.aggregates,
    };

    if output.is_json() {
        return output.result(process_output);
    }

    let aggregates = &process_output.aggregates;
    output.success(format!(
        "Area {} complete in {:.1}s",
        process_output.area_id,
        process_output.processing_seconds.unwrap_or_default()
    ));

    output.section("Tiles");
    output.kv("Total", aggregates.tile_count);
    output.kv("Enriched", aggregates.status_counts.enriched);
    output.kv("Collected only", aggregates.status_counts.collected);
    output.kv("Collection failed", aggregates.status_counts.collection_failed);
    output.kv("Approximate area", format!("{:.2} ha", aggregates.approximate_hectares));

    if let Some(error) = &process_output.enrichment_error {
        output.warning(format!("Recommendations unavailable: {}", error));
    }

    output.section("Dominant Crops");
    output.table(
        aggregates
            .dominant_crops
            .iter()
            .map(|crop| CropRow {
                plant: crop.plant.clone(),
                tiles: crop.tile_count,
                confidence: format!("{:.2}", crop.average_confidence),
            })
            .collect(),
    );

    output.section("Environment");
    output.table(
        aggregates
            .environment_summary
            .iter()
            .map(|(metric, mean)| MetricRow { metric: metric.clone(), mean: format!("{:.2}", mean) })
            .collect(),
    );

    Ok(())
}
