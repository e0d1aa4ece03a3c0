use tumbuh_pipeline::{HyperlocalService, MetricCatalog, PipelineOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: PipelineOrchestrator,
    pub hyperlocal: HyperlocalService,
}

impl AppState {
    pub fn new(orchestrator: PipelineOrchestrator, hyperlocal: HyperlocalService) -> Self {
        Self { orchestrator, hyperlocal }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        self.orchestrator.aggregator().catalog()
    }
}
