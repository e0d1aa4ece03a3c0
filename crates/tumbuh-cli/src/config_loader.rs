//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tumbuh_core::config::{CliConfigOverrides, LayeredConfig};

/// Load layered configuration: defaults, file, environment, then CLI overrides
///
/// Without an explicit path, `tumbuh.toml` in the current directory is used
/// when it exists.
pub fn load_config(path: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let base = LayeredConfig::with_defaults();
    let config = match path {
        Some(path) => base
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?,
        None => base
            .load_from_dir_if_present(std::env::current_dir()?)
            .context("Failed to load tumbuh.toml")?,
    };

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    config.validate()?;
    Ok(config)
}

/// Read a GeoJSON document from disk
pub fn read_geojson(path: &Path) -> Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumbuh_core::config::ConfigSource;

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tumbuh.toml");
        fs::write(&path, "workers = 3\nmax_tiles = 900\n").unwrap();

        let overrides = CliConfigOverrides { workers: Some(6), ..Default::default() };
        let config = load_config(Some(&path), overrides).unwrap();

        assert_eq!(config.workers.value, 6);
        assert_eq!(config.workers.source, ConfigSource::Cli);
        assert_eq!(config.max_tiles.value, 900);
        assert_eq!(config.max_tiles.source, ConfigSource::File);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")), CliConfigOverrides::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_read_geojson_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.geojson");
        fs::write(&path, "not json").unwrap();
        assert!(read_geojson(&path).is_err());
    }
}
