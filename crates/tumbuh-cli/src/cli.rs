use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tumbuh_core::config::CliConfigOverrides;

/// Tumbuh - Crop recommendations for agricultural areas of interest
#[derive(Parser, Debug)]
#[command(name = "tumbuh")]
#[command(about = "Tile a field, collect environmental variables and recommend crops", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./tumbuh.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tile a GeoJSON boundary offline and print the grid
    Tile(TileArgs),

    /// Show the effective configuration and where each value came from
    Config,

    /// Run the full pipeline for a GeoJSON boundary
    Process(ProcessArgs),
}

/// Configuration values settable from the command line
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Concurrent variable fetches per area
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Maximum tiles per area
    #[arg(long, global = true)]
    pub max_tiles: Option<usize>,

    /// Per-tile variable fetch timeout in seconds (0 disables)
    #[arg(long, global = true, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// Gemini model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of the variable service
    #[arg(long, global = true, value_name = "URL")]
    pub variables_url: Option<String>,
}

impl OverrideArgs {
    pub fn into_overrides(self) -> CliConfigOverrides {
        CliConfigOverrides {
            workers: self.workers,
            max_tiles: self.max_tiles,
            fetch_timeout_secs: self.fetch_timeout,
            gemini_model: self.model,
            variables_url: self.variables_url,
        }
    }
}

#[derive(Parser, Debug)]
pub struct TileArgs {
    /// GeoJSON file holding a Polygon, MultiPolygon, Feature or FeatureCollection
    pub path: PathBuf,

    /// Tile edge length in meters (5-100)
    #[arg(long)]
    pub tile_size: Option<i64>,

    /// Tiles listed in human output
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// GeoJSON file holding the area boundary
    pub path: PathBuf,

    /// Area name (defaults to the file stem)
    #[arg(long)]
    pub name: Option<String>,

    /// Tile edge length in meters (5-100)
    #[arg(long)]
    pub tile_size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tumbuh", "process", "field.geojson", "--tile-size", "20", "--workers", "8", "--json",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.overrides.workers, Some(8));
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.tile_size, Some(20));
                assert_eq!(args.path, PathBuf::from("field.geojson"));
            }
            other => panic!("Expected process command, got {:?}", other),
        }
    }
}
