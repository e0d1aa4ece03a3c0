use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{Bounds, InsightContext, InsightItem, Recommendation, VariableBag, MAX_RECOMMENDATIONS};

use crate::ports::{InsightProvider, Recommender};
use crate::response::{parse_batch_response, parse_insight_response};

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

const RECOMMEND_TEMPERATURE: f32 = 0.4;
const INSIGHT_TEMPERATURE: f32 = 0.2;

/// Thin client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    /// Base URL (e.g., "https://generativelanguage.googleapis.com")
    base_url: String,

    /// Model name (e.g., "gemini-2.5-flash")
    model: String,

    api_key: String,

    /// Attach the Google Search grounding tool to requests
    grounding: bool,

    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("grounding", &self.grounding)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client for `model`, failing when no API key is configured
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TumbuhError::ConfigMissing { key: "GOOGLE_API_KEY".to_string() });
        }
        Ok(Self {
            base_url: DEFAULT_GEMINI_URL.to_string(),
            model: model.into(),
            api_key,
            grounding: true,
            client: reqwest::Client::new(),
        })
    }

    /// Point the client at a different endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable search grounding
    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn uses_grounding(&self) -> bool {
        self.grounding
    }

    fn build_request(&self, parts: &[String], temperature: f32) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: parts.iter().map(|text| Part { text: Some(text.clone()) }).collect(),
            }],
            generation_config: GenerationConfig { temperature },
            tools: if self.grounding { vec![json!({"google_search": {}})] } else { Vec::new() },
        }
    }

    /// Send text parts as one user turn and return the concatenated reply text
    pub async fn generate(&self, parts: &[String], temperature: f32) -> Result<String> {
        let request = self.build_request(parts, temperature);

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TumbuhError::ProviderUnavailable {
                reason: format!("Failed to reach Gemini: {}", e),
                remediation: format!(
                    "Check network access to {} and that GOOGLE_API_KEY is valid",
                    self.base_url
                ),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TumbuhError::ProviderUnavailable {
                reason: format!("Gemini API error ({}): {}", status, error_text),
                remediation: format!(
                    "Check that the model '{}' exists and the API key has quota left",
                    self.model
                ),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            TumbuhError::ProviderUnavailable {
                reason: format!("Failed to parse Gemini response: {}", e),
                remediation: "Check Gemini API compatibility".to_string(),
            }
        })?;

        extract_text(&body)
    }
}

/// Concatenate the text parts of every candidate
fn extract_text(response: &GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(TumbuhError::Enrichment("Gemini returned no text".to_string()));
    }
    Ok(text)
}

/// Crop recommendations from Gemini, one batched request per area
#[derive(Debug, Clone)]
pub struct GeminiCropAdvisor {
    client: GeminiClient,
}

impl GeminiCropAdvisor {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    fn build_prompt(batch: &[VariableBag]) -> Result<Vec<String>> {
        let instruction = format!(
            "You are an expert agronomist. For every tile below, analyse its environmental \
             variables and suggest up to {max} crops with the best potential. Reply with JSON only, \
             shaped as {{\"tiles\": [{{\"index\": <int>, \"recommendations\": [{{\"plant\": str, \
             \"confidence\": float between 0 and 1, \"rationale\": str}}]}}]}}. Copy each tile's \
             integer index exactly as given. Confidence must be numeric. Use search grounding \
             to check each suggestion against published agronomic guidance.",
            max = MAX_RECOMMENDATIONS
        );

        let tiles: Vec<serde_json::Value> = batch
            .iter()
            .enumerate()
            .map(|(index, variables)| json!({"index": index, "variables": variables}))
            .collect();

        Ok(vec![instruction, serde_json::to_string(&json!({ "tiles": tiles }))?])
    }
}

#[async_trait]
impl Recommender for GeminiCropAdvisor {
    async fn recommend(&self, batch: &[VariableBag]) -> Result<Vec<Option<Vec<Recommendation>>>> {
        let parts = Self::build_prompt(batch)?;
        let text = self.client.generate(&parts, RECOMMEND_TEMPERATURE).await?;
        let slots = parse_batch_response(&text, batch.len())?;

        tracing::debug!(
            model = self.client.model_name(),
            batch = batch.len(),
            answered = slots.iter().filter(|s| s.is_some()).count(),
            "Parsed recommendation batch"
        );
        Ok(slots)
    }
}

/// Hyperlocal weather, risk and market insights from Gemini
#[derive(Debug, Clone)]
pub struct GeminiInsightProvider {
    client: GeminiClient,
}

impl GeminiInsightProvider {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(bounds: &Bounds, context: &InsightContext) -> Vec<String> {
        let mut instruction = String::from(
            "You are a digital agronomy analyst. Use search grounding to gather recent, factual \
             and verifiable information from official sources. Return at least 3 and at most 5 \
             hyperlocal items as JSON: {\"items\": [{\"title\": str, \"summary\": str, \
             \"source_name\": str, \"source_url\": str}]}. Each item must cover one of: the \
             3-day weather forecast, the last 7 days of rainfall and climate, risk warnings \
             (flood, drought, crop disease, earthquake), or agricultural commodity prices. \
             Include key figures with dates and places. Only use information published in the \
             last 30 days (60 days for commodity prices). Cite credible sources only. Do not add \
             text outside the JSON.",
        );
        if !context.primary_crops.is_empty() {
            instruction.push_str(&format!(
                " Focus every item on how it affects these crops: {}.",
                context.primary_crops.join(", ")
            ));
        }

        let mut parts = vec![
            instruction,
            format!(
                "Location context: center lat {:.6}, lon {:.6}. Bounds: north {:.6}, south {:.6}, \
                 east {:.6}, west {:.6}.",
                bounds.center_lat,
                bounds.center_lon,
                bounds.north,
                bounds.south,
                bounds.east,
                bounds.west
            ),
            format!("Area name: {}.", context.area_name),
        ];
        if !context.primary_crops.is_empty() {
            parts.push(format!("Focus crops: {}.", context.primary_crops.join(", ")));
        }
        parts
    }
}

#[async_trait]
impl InsightProvider for GeminiInsightProvider {
    async fn insights(&self, bounds: &Bounds, context: &InsightContext) -> Result<Vec<InsightItem>> {
        let parts = Self::build_prompt(bounds, context);
        let text = self.client.generate(&parts, INSIGHT_TEMPERATURE).await?;
        parse_insight_response(&text)
    }
}

/// Request body for the generateContent API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Response from the generateContent API
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
