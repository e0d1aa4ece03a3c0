//! Variable provider assembled from per-category sources.
//!
//! One centroid fans out to every configured category. A failing category is
//! recorded in the bag as `{"status": "error", "message": ...}` so the rest of
//! the tile survives; the fetch itself fails only when every category failed.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{Centroid, VariableBag, VariableCategory};

use crate::ports::VariableProvider;

/// Date range used by time-dependent categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days` days ending today (UTC)
    pub fn last_days(days: u32) -> Self {
        Self::ending_at(Utc::now().date_naive(), days)
    }

    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        Self { start: end - Duration::days(i64::from(days)), end }
    }
}

/// Source of one category of environmental data
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn fetch(
        &self,
        category: VariableCategory,
        centroid: Centroid,
        window: DateWindow,
    ) -> Result<Value>;
}

/// Category source backed by an HTTP service exposing
/// `GET {base}/{category}?lat=&lon=&start=&end=`
#[derive(Debug, Clone)]
pub struct HttpCategorySource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCategorySource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, category: VariableCategory) -> String {
        format!("{}/{}", self.base_url, category)
    }
}

#[async_trait]
impl CategorySource for HttpCategorySource {
    async fn fetch(
        &self,
        category: VariableCategory,
        centroid: Centroid,
        window: DateWindow,
    ) -> Result<Value> {
        let query = [
            ("lat", centroid.lat.to_string()),
            ("lon", centroid.lon.to_string()),
            ("start", window.start.format("%Y-%m-%d").to_string()),
            ("end", window.end.format("%Y-%m-%d").to_string()),
        ];

        let response = self
            .client
            .get(self.url(category))
            .query(&query)
            .send()
            .await
            .map_err(|e| TumbuhError::ProviderUnavailable {
                reason: format!("Failed to reach variable service for {}: {}", category, e),
                remediation: format!(
                    "Ensure the variable service is running at {} (TUMBUH_VARIABLES_URL)",
                    self.base_url
                ),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TumbuhError::Collection(format!(
                "{} request failed ({}): {}",
                category, status, error_text
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TumbuhError::Collection(format!("Invalid {} response: {}", category, e)))
    }
}

/// Variable provider that assembles a bag from one source per category
#[derive(Clone)]
pub struct CompositeVariableProvider {
    source: Arc<dyn CategorySource>,
    categories: Vec<VariableCategory>,
    window_days: u32,
}

impl CompositeVariableProvider {
    /// Query every category from `source` over the last `window_days` days
    pub fn new(source: Arc<dyn CategorySource>, window_days: u32) -> Self {
        Self { source, categories: VariableCategory::ALL.to_vec(), window_days }
    }

    /// Restrict the queried categories
    pub fn with_categories(mut self, categories: Vec<VariableCategory>) -> Self {
        self.categories = categories;
        self
    }

    async fn fetch_in_window(&self, centroid: Centroid, window: DateWindow) -> Result<VariableBag> {
        let results = join_all(
            self.categories.iter().map(|category| self.source.fetch(*category, centroid, window)),
        )
        .await;

        let mut bag = VariableBag::new();
        let mut errors = Vec::new();
        for (category, result) in self.categories.iter().zip(results) {
            match result {
                Ok(value) => bag.insert(category.as_str(), value),
                Err(e) => {
                    tracing::debug!(%category, lat = centroid.lat, lon = centroid.lon, error = %e, "Category fetch failed");
                    bag.insert(category.as_str(), json!({"status": "error", "message": e.to_string()}));
                    errors.push(format!("{}: {}", category, e));
                }
            }
        }

        if !self.categories.is_empty() && errors.len() == self.categories.len() {
            return Err(TumbuhError::Collection(format!(
                "all categories failed ({})",
                errors.join("; ")
            )));
        }
        Ok(bag)
    }
}

#[async_trait]
impl VariableProvider for CompositeVariableProvider {
    async fn fetch(&self, centroid: Centroid) -> Result<VariableBag> {
        self.fetch_in_window(centroid, DateWindow::last_days(self.window_days)).await
    }
}
