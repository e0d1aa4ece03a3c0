//! Provider wiring from layered configuration.

use std::sync::Arc;
use tumbuh_core::config::LayeredConfig;
use tumbuh_core::error::Result;

use crate::gemini::{GeminiClient, GeminiCropAdvisor, GeminiInsightProvider};
use crate::ports::{InsightProvider, Recommender, VariableProvider};
use crate::variables::{CompositeVariableProvider, HttpCategorySource};

/// Variable service used when `variables_url` is not configured
pub const DEFAULT_VARIABLES_URL: &str = "http://localhost:8000/variables";

/// The three providers a pipeline needs
#[derive(Clone)]
pub struct Providers {
    pub variables: Arc<dyn VariableProvider>,
    pub recommender: Arc<dyn Recommender>,
    pub insights: Arc<dyn InsightProvider>,
}

impl Providers {
    /// Build the Gemini and HTTP variable adapters
    ///
    /// Fails with `ConfigMissing` when `api_key` is empty.
    pub fn from_config(config: &LayeredConfig, api_key: &str) -> Result<Self> {
        let client = GeminiClient::new(api_key, config.gemini_model.value.clone())?;

        let variables_url = match &config.variables_url.value {
            Some(url) => url.clone(),
            None => {
                tracing::warn!(
                    url = DEFAULT_VARIABLES_URL,
                    "TUMBUH_VARIABLES_URL not set, using default variable service"
                );
                DEFAULT_VARIABLES_URL.to_string()
            }
        };
        let source = Arc::new(HttpCategorySource::new(variables_url));

        Ok(Self {
            variables: Arc::new(CompositeVariableProvider::new(
                source,
                config.collection_window_days.value,
            )),
            recommender: Arc::new(GeminiCropAdvisor::new(client.clone())),
            insights: Arc::new(GeminiInsightProvider::new(client)),
        })
    }
}
