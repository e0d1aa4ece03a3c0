use anyhow::{bail, Result};
use tumbuh_core::config::{validate_tile_size, LayeredConfig};
use tumbuh_geo::spatial::approximate_area_m2;
use tumbuh_geo::{parse_boundary, PolygonTiler};

use crate::cli::TileArgs;
use crate::config_loader::read_geojson;
use crate::output::OutputWriter;
use crate::output_types::{TileOutput, TileRow};

pub fn execute(args: TileArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let geometry = read_geojson(&args.path)?;
    let tile_size = match args.tile_size {
        Some(size) => validate_tile_size(size)?,
        None => config.default_tile_size.value,
    };

    let boundary = parse_boundary(&geometry)?;
    let tiler = PolygonTiler::new(&boundary, tile_size)?;
    let plan = *tiler.plan();

    if plan.cell_count() > config.max_grid_cells.value {
        bail!(
            "Grid of {} cells exceeds max_grid_cells ({}); use a larger --tile-size",
            plan.cell_count(),
            config.max_grid_cells.value
        );
    }

    let tiles = tiler.tiles();
    tracing::debug!(rows = plan.rows, cols = plan.cols, tiles = tiles.len(), "Tiled boundary");

    let tile_area_m2 = f64::from(tile_size) * f64::from(tile_size);
    let result = TileOutput {
        tile_size_meters: tile_size,
        rows: plan.rows,
        cols: plan.cols,
        grid_cells: plan.cell_count(),
        tile_count: tiles.len(),
        approximate_hectares: tiles.len() as f64 * tile_area_m2 / 10_000.0,
        polygon_hectares: approximate_area_m2(&boundary) / 10_000.0,
        tiles,
    };

    if output.is_json() {
        return output.result(result);
    }

    output.section("Grid");
    output.kv("Tile size", format!("{} m", result.tile_size_meters));
    output.kv("Rows × cols", format!("{} × {}", result.rows, result.cols));
    output.kv("Tiles inside boundary", format!("{} of {}", result.tile_count, result.grid_cells));
    output.kv("Approximate area", format!("{:.2} ha", result.approximate_hectares));
    output.kv("Polygon area", format!("{:.2} ha", result.polygon_hectares));

    if result.tiles.is_empty() {
        output.warning("No grid cell centroid falls inside the boundary; try a smaller --tile-size");
        return Ok(());
    }

    output.section("Tiles");
    output.table(result.tiles.iter().take(args.limit).map(TileRow::from).collect());
    if result.tiles.len() > args.limit {
        output.info(format!(
            "{} more tiles not shown (use --limit or --json)",
            result.tiles.len() - args.limit
        ));
    }

    Ok(())
}
