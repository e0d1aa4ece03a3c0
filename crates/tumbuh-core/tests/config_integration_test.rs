//! Integration tests for layered configuration
//!
//! These tests verify that configuration loading follows the correct precedence:
//! CLI arguments > Environment variables > Config file > Defaults

use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tumbuh_core::config::{
    CliConfigOverrides, ConfigSource, LayeredConfig, PipelineConfig, CONFIG_FILE_NAME,
};

const ENV_KEYS: [&str; 5] = [
    "TUMBUH_WORKERS",
    "TUMBUH_MAX_TILES",
    "TUMBUH_FETCH_TIMEOUT_SECS",
    "TUMBUH_GEMINI_MODEL",
    "TUMBUH_VARIABLES_URL",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

#[test]
fn test_defaults_match_pipeline_defaults() {
    let config = LayeredConfig::with_defaults();
    assert_eq!(config.pipeline_config(), PipelineConfig::default());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
workers = 6
gemini_model = "file-model"
"#
    )
    .unwrap();

    env::set_var("TUMBUH_WORKERS", "12");
    env::set_var("TUMBUH_GEMINI_MODEL", "env-model");

    let config = LayeredConfig::with_defaults()
        .load_from_file(file.path())
        .unwrap()
        .load_from_env();

    assert_eq!(config.workers.value, 12);
    assert_eq!(config.workers.source, ConfigSource::Environment);
    assert_eq!(config.gemini_model.value, "env-model");
    assert_eq!(config.gemini_model.source, ConfigSource::Environment);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_environment_value_is_ignored() {
    clear_env();
    env::set_var("TUMBUH_MAX_TILES", "lots");

    let config = LayeredConfig::with_defaults().load_from_env();
    assert_eq!(config.max_tiles.value, 5000);
    assert_eq!(config.max_tiles.source, ConfigSource::Default);

    clear_env();
}

#[test]
#[serial]
fn test_configuration_precedence_order() {
    clear_env();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "fetch_timeout_secs = 45").unwrap();
    env::set_var("TUMBUH_FETCH_TIMEOUT_SECS", "60");

    let mut config = LayeredConfig::with_defaults()
        .load_from_file(file.path())
        .unwrap()
        .load_from_env();
    assert_eq!(config.fetch_timeout_secs.value, 60);

    config.update_from_cli(CliConfigOverrides {
        fetch_timeout_secs: Some(10),
        ..Default::default()
    });
    assert_eq!(config.fetch_timeout_secs.source, ConfigSource::Cli);
    assert_eq!(config.pipeline_config().fetch_timeout, Some(Duration::from_secs(10)));

    clear_env();
}

#[test]
fn test_load_from_dir_if_present() {
    let dir = TempDir::new().unwrap();

    let config = LayeredConfig::with_defaults().load_from_dir_if_present(dir.path()).unwrap();
    assert_eq!(config.workers.source, ConfigSource::Default);

    fs::write(dir.path().join(CONFIG_FILE_NAME), "max_grid_cells = 20000\n").unwrap();
    let config = LayeredConfig::with_defaults().load_from_dir_if_present(dir.path()).unwrap();
    assert_eq!(config.max_grid_cells.value, 20_000);
    assert_eq!(config.max_grid_cells.source, ConfigSource::File);
}

#[test]
fn test_missing_config_file() {
    let result = LayeredConfig::with_defaults().load_from_file("/nonexistent/tumbuh.toml");
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_full_configuration_workflow() {
    clear_env();

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "workers = 2\nvariables_url = \"http://file.example/variables\"\n",
    )
    .unwrap();
    env::set_var("TUMBUH_VARIABLES_URL", "http://env.example/variables");

    let mut config = LayeredConfig::with_defaults()
        .load_from_dir_if_present(dir.path())
        .unwrap()
        .load_from_env();
    config.update_from_cli(CliConfigOverrides {
        max_tiles: Some(250),
        ..Default::default()
    });

    assert!(config.validate().is_ok());
    let map = config.to_inspection_map();
    assert_eq!(map["workers"], ("2".to_string(), ConfigSource::File));
    assert_eq!(
        map["variables_url"],
        ("http://env.example/variables".to_string(), ConfigSource::Environment)
    );
    assert_eq!(map["max_tiles"], ("250".to_string(), ConfigSource::Cli));

    clear_env();
}
