use crate::error::{Result, TumbuhError};
use crate::models::MetricPath;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Smallest accepted tile edge length in meters
pub const MIN_TILE_SIZE_M: u32 = 5;

/// Largest accepted tile edge length in meters
pub const MAX_TILE_SIZE_M: u32 = 100;

/// Default configuration file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "tumbuh.toml";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Settings injected into the pipeline orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Concurrent variable fetches per area
    pub workers: usize,
    /// Admission ceiling on included tiles
    pub max_tiles: usize,
    /// Admission ceiling on raw grid cells scanned to count included tiles
    pub max_grid_cells: usize,
    /// Per-fetch timeout, `None` disables it
    pub fetch_timeout: Option<Duration>,
    /// Tile size used when a request omits one
    pub default_tile_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_tiles: 5000,
            max_grid_cells: 100_000,
            fetch_timeout: Some(Duration::from_secs(120)),
            default_tile_size: 15,
        }
    }
}

/// Layered configuration for Tumbuh
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub workers: ConfigValue<usize>,
    pub max_tiles: ConfigValue<usize>,
    pub max_grid_cells: ConfigValue<usize>,
    pub fetch_timeout_secs: ConfigValue<u64>,
    pub default_tile_size: ConfigValue<u32>,
    pub gemini_model: ConfigValue<String>,
    pub variables_url: ConfigValue<Option<String>>,
    pub collection_window_days: ConfigValue<u32>,
    /// Metric name to lookup paths, replacing or extending the built-in catalog
    pub metrics: ConfigValue<BTreeMap<String, Vec<String>>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            workers: ConfigValue::new(pipeline.workers, ConfigSource::Default),
            max_tiles: ConfigValue::new(pipeline.max_tiles, ConfigSource::Default),
            max_grid_cells: ConfigValue::new(pipeline.max_grid_cells, ConfigSource::Default),
            fetch_timeout_secs: ConfigValue::new(120, ConfigSource::Default),
            default_tile_size: ConfigValue::new(pipeline.default_tile_size, ConfigSource::Default),
            gemini_model: ConfigValue::new("gemini-2.5-flash".to_string(), ConfigSource::Default),
            variables_url: ConfigValue::new(None, ConfigSource::Default),
            collection_window_days: ConfigValue::new(7, ConfigSource::Default),
            metrics: ConfigValue::new(BTreeMap::new(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| TumbuhError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| TumbuhError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(workers) = file_config.workers {
            self.workers.update(workers, ConfigSource::File);
        }

        if let Some(max_tiles) = file_config.max_tiles {
            self.max_tiles.update(max_tiles, ConfigSource::File);
        }

        if let Some(max_grid_cells) = file_config.max_grid_cells {
            self.max_grid_cells.update(max_grid_cells, ConfigSource::File);
        }

        if let Some(secs) = file_config.fetch_timeout_secs {
            self.fetch_timeout_secs.update(secs, ConfigSource::File);
        }

        if let Some(size) = file_config.default_tile_size {
            self.default_tile_size.update(size, ConfigSource::File);
        }

        if let Some(model) = file_config.gemini_model {
            self.gemini_model.update(model, ConfigSource::File);
        }

        if let Some(url) = file_config.variables_url {
            self.variables_url.update(Some(url), ConfigSource::File);
        }

        if let Some(days) = file_config.collection_window_days {
            self.collection_window_days.update(days, ConfigSource::File);
        }

        if let Some(metrics) = file_config.metrics {
            self.metrics.update(metrics, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load `tumbuh.toml` from `dir` when it exists
    pub fn load_from_dir_if_present<P: AsRef<Path>>(self, dir: P) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if path.is_file() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Some(workers) = env_parse::<usize>("TUMBUH_WORKERS", "positive integer") {
            self.workers.update(workers, ConfigSource::Environment);
        }

        if let Some(max_tiles) = env_parse::<usize>("TUMBUH_MAX_TILES", "positive integer") {
            self.max_tiles.update(max_tiles, ConfigSource::Environment);
        }

        if let Some(cells) = env_parse::<usize>("TUMBUH_MAX_GRID_CELLS", "positive integer") {
            self.max_grid_cells.update(cells, ConfigSource::Environment);
        }

        if let Some(secs) = env_parse::<u64>("TUMBUH_FETCH_TIMEOUT_SECS", "seconds, 0 disables") {
            self.fetch_timeout_secs.update(secs, ConfigSource::Environment);
        }

        if let Some(size) = env_parse::<u32>("TUMBUH_DEFAULT_TILE_SIZE", "meters between 5 and 100")
        {
            self.default_tile_size.update(size, ConfigSource::Environment);
        }

        if let Ok(model) = env::var("TUMBUH_GEMINI_MODEL") {
            self.gemini_model.update(model, ConfigSource::Environment);
        }

        if let Ok(url) = env::var("TUMBUH_VARIABLES_URL") {
            self.variables_url.update(Some(url), ConfigSource::Environment);
        }

        if let Some(days) = env_parse::<u32>("TUMBUH_COLLECTION_WINDOW_DAYS", "number of days") {
            self.collection_window_days.update(days, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(workers) = overrides.workers {
            self.workers.update(workers, ConfigSource::Cli);
        }

        if let Some(max_tiles) = overrides.max_tiles {
            self.max_tiles.update(max_tiles, ConfigSource::Cli);
        }

        if let Some(secs) = overrides.fetch_timeout_secs {
            self.fetch_timeout_secs.update(secs, ConfigSource::Cli);
        }

        if let Some(model) = overrides.gemini_model {
            self.gemini_model.update(model, ConfigSource::Cli);
        }

        if let Some(url) = overrides.variables_url {
            self.variables_url.update(Some(url), ConfigSource::Cli);
        }
    }

    /// Check that every effective value is usable
    pub fn validate(&self) -> Result<()> {
        if self.workers.value == 0 {
            return Err(TumbuhError::ConfigInvalid {
                key: "workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.max_tiles.value == 0 {
            return Err(TumbuhError::ConfigInvalid {
                key: "max_tiles".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.max_grid_cells.value < self.max_tiles.value {
            return Err(TumbuhError::ConfigInvalid {
                key: "max_grid_cells".to_string(),
                reason: format!("must not be smaller than max_tiles ({})", self.max_tiles.value),
            });
        }

        validate_tile_size(i64::from(self.default_tile_size.value)).map_err(|_| {
            TumbuhError::ConfigInvalid {
                key: "default_tile_size".to_string(),
                reason: format!(
                    "must be between {} and {} meters",
                    MIN_TILE_SIZE_M, MAX_TILE_SIZE_M
                ),
            }
        })?;

        if self.collection_window_days.value == 0 {
            return Err(TumbuhError::ConfigInvalid {
                key: "collection_window_days".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for (name, paths) in &self.metrics.value {
            let key = format!("metrics.{}", name);
            if paths.is_empty() {
                return Err(TumbuhError::ConfigInvalid {
                    key,
                    reason: "needs at least one lookup path".to_string(),
                });
            }
            for path in paths {
                path.parse::<MetricPath>().map_err(|e| TumbuhError::ConfigInvalid {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            }
        }

        Ok(())
    }

    /// Plain pipeline settings for the orchestrator
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers.value,
            max_tiles: self.max_tiles.value,
            max_grid_cells: self.max_grid_cells.value,
            fetch_timeout: match self.fetch_timeout_secs.value {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            default_tile_size: self.default_tile_size.value,
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("workers".to_string(), (self.workers.value.to_string(), self.workers.source));

        map.insert(
            "max_tiles".to_string(),
            (self.max_tiles.value.to_string(), self.max_tiles.source),
        );

        map.insert(
            "max_grid_cells".to_string(),
            (self.max_grid_cells.value.to_string(), self.max_grid_cells.source),
        );

        let timeout = match self.fetch_timeout_secs.value {
            0 => "disabled".to_string(),
            secs => format!("{}s", secs),
        };
        map.insert("fetch_timeout".to_string(), (timeout, self.fetch_timeout_secs.source));

        map.insert(
            "default_tile_size".to_string(),
            (format!("{} m", self.default_tile_size.value), self.default_tile_size.source),
        );

        map.insert(
            "gemini_model".to_string(),
            (self.gemini_model.value.clone(), self.gemini_model.source),
        );

        map.insert(
            "variables_url".to_string(),
            (
                self.variables_url.value.clone().unwrap_or_else(|| "(not set)".to_string()),
                self.variables_url.source,
            ),
        );

        map.insert(
            "collection_window_days".to_string(),
            (self.collection_window_days.value.to_string(), self.collection_window_days.source),
        );

        let metrics = if self.metrics.value.is_empty() {
            "(built-in catalog)".to_string()
        } else {
            self.metrics.value.keys().cloned().collect::<Vec<_>>().join(", ")
        };
        map.insert("metrics".to_string(), (metrics, self.metrics.source));

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    workers: Option<usize>,
    max_tiles: Option<usize>,
    max_grid_cells: Option<usize>,
    fetch_timeout_secs: Option<u64>,
    default_tile_size: Option<u32>,
    gemini_model: Option<String>,
    variables_url: Option<String>,
    collection_window_days: Option<u32>,
    metrics: Option<BTreeMap<String, Vec<String>>>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub workers: Option<usize>,
    pub max_tiles: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    pub gemini_model: Option<String>,
    pub variables_url: Option<String>,
}

/// Check a requested tile size against the accepted range
pub fn validate_tile_size(size: i64) -> Result<u32> {
    if size < i64::from(MIN_TILE_SIZE_M) || size > i64::from(MAX_TILE_SIZE_M) {
        return Err(TumbuhError::validation(
            "tile_size_meters",
            format!(
                "must be between {} and {} meters, got {}",
                MIN_TILE_SIZE_M, MAX_TILE_SIZE_M, size
            ),
        ));
    }
    Ok(size as u32)
}

fn env_parse<T: FromStr>(key: &str, expected: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", key, raw, expected);
            None
        }
    }
}
