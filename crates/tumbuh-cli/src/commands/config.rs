use anyhow::Result;
use tumbuh_core::config::LayeredConfig;

use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, ConfigOutput, ConfigRow};

/// Show the effective configuration with provenance
pub fn execute(config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let inspection_map = config.to_inspection_map();

    if output.is_json() {
        let entries: ConfigOutput = inspection_map
            .into_iter()
            .map(|(key, (value, source))| (key, ConfigEntry { value, source: format!("{:?}", source) }))
            .collect();
        return output.result(entries);
    }

    output.section("Configuration Values");

    let mut rows: Vec<ConfigRow> = inspection_map
        .into_iter()
        .map(|(key, (value, source))| ConfigRow { key, value, source: format!("{:?}", source) })
        .collect();

    // Sort by key for consistent output
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    output.table(rows);

    output.section("Configuration Precedence");
    output.info("CLI arguments > Environment variables > Config file > Defaults");

    Ok(())
}
