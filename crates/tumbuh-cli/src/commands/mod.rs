//! Command implementations

mod config;
mod process;
mod tile;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(cli.config.as_deref(), cli.overrides.into_overrides())?;

    match cli.command {
        Commands::Tile(args) => tile::execute(args, &config, &output),
        Commands::Config => config::execute(&config, &output),
        Commands::Process(args) => process::execute(args, &config, &output).await,
    }
}
