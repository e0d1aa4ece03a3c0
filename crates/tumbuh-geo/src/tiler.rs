//! Polygon tiling.
//!
//! The boundary's bounding box is partitioned into a regular `rows × cols`
//! grid of cells whose physical edge length is the requested tile size.
//! Row 0 sits on the minimum-latitude edge and column 0 on the
//! minimum-longitude edge. A cell becomes a tile only when its centroid lies
//! inside the polygon (boundary points count as inside). Footprints are the
//! raw grid rectangles and are never clipped to the polygon.

use geo::{Area, Polygon};
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{Boundary, BoundingBox, Centroid, TileFootprint};

use crate::spatial::{meters_per_degree_lon, point_in_polygon, to_polygon, METERS_PER_DEGREE_LAT};

/// Keeps an extent that is an exact multiple of the step from gaining a sliver row
const GRID_EPSILON: f64 = 1e-9;

/// Grid layout over a bounding box, without materialized footprints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlan {
    pub bbox: BoundingBox,
    pub rows: usize,
    pub cols: usize,
    /// Cell height in degrees of latitude
    pub lat_step: f64,
    /// Cell width in degrees of longitude
    pub lon_step: f64,
}

impl GridPlan {
    /// Lay out a grid of `tile_size_meters` cells over `bbox`
    pub fn new(bbox: BoundingBox, tile_size_meters: u32) -> Self {
        let size = f64::from(tile_size_meters);
        let lat_step = size / METERS_PER_DEGREE_LAT;
        let lon_step = size / meters_per_degree_lon(bbox.center().lat);

        Self {
            bbox,
            rows: cells_along(bbox.height_degrees(), lat_step),
            cols: cells_along(bbox.width_degrees(), lon_step),
            lat_step,
            lon_step,
        }
    }

    /// Total grid cells, inside the polygon or not
    pub fn cell_count(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }

    /// Rectangle of cell `(row, col)`
    pub fn cell(&self, row: usize, col: usize) -> BoundingBox {
        let min_lat = self.bbox.min_lat + row as f64 * self.lat_step;
        let min_lon = self.bbox.min_lon + col as f64 * self.lon_step;
        BoundingBox::new(min_lat, min_lon, min_lat + self.lat_step, min_lon + self.lon_step)
    }

    /// Centroid of cell `(row, col)`
    pub fn cell_centroid(&self, row: usize, col: usize) -> Centroid {
        Centroid::new(
            self.bbox.min_lat + (row as f64 + 0.5) * self.lat_step,
            self.bbox.min_lon + (col as f64 + 0.5) * self.lon_step,
        )
    }
}

fn cells_along(extent: f64, step: f64) -> usize {
    if !(extent > 0.0) || !(step > 0.0) {
        return 1;
    }
    ((extent / step) - GRID_EPSILON).ceil().max(1.0) as usize
}

/// Count grid cells whose centroid falls inside `boundary`
///
/// Works on any boundary, degenerate or not, and never allocates footprints.
pub fn count_inside(boundary: &Boundary, plan: &GridPlan) -> usize {
    let polygon = to_polygon(boundary);
    let mut count = 0;
    for row in 0..plan.rows {
        for col in 0..plan.cols {
            if point_in_polygon(&polygon, plan.cell_centroid(row, col)) {
                count += 1;
            }
        }
    }
    count
}

/// Partitions a boundary polygon into a grid of tiles
#[derive(Debug, Clone)]
pub struct PolygonTiler {
    polygon: Polygon<f64>,
    plan: GridPlan,
}

impl PolygonTiler {
    /// Prepare a tiler, rejecting degenerate boundaries
    pub fn new(boundary: &Boundary, tile_size_meters: u32) -> Result<Self> {
        if tile_size_meters == 0 {
            return Err(TumbuhError::Tiling("tile size must be positive".to_string()));
        }

        let distinct = boundary.distinct_vertex_count();
        if distinct < 3 {
            return Err(TumbuhError::Tiling(format!(
                "polygon needs at least 3 distinct vertices, found {}",
                distinct
            )));
        }

        let polygon = to_polygon(boundary);
        if !(polygon.unsigned_area() > 0.0) {
            return Err(TumbuhError::Tiling("polygon has zero area".to_string()));
        }

        let bbox = boundary
            .bounding_box()
            .ok_or_else(|| TumbuhError::Tiling("polygon has no vertices".to_string()))?;

        Ok(Self { polygon, plan: GridPlan::new(bbox, tile_size_meters) })
    }

    pub fn plan(&self) -> &GridPlan {
        &self.plan
    }

    /// Whether a point lies inside the tiled polygon
    pub fn contains(&self, point: Centroid) -> bool {
        point_in_polygon(&self.polygon, point)
    }

    /// Included tiles in row-major order
    pub fn tiles(&self) -> Vec<TileFootprint> {
        let mut tiles = Vec::new();
        for row in 0..self.plan.rows {
            for col in 0..self.plan.cols {
                let centroid = self.plan.cell_centroid(row, col);
                if self.contains(centroid) {
                    tiles.push(TileFootprint {
                        row,
                        col,
                        footprint: self.plan.cell(row, col),
                        centroid,
                    });
                }
            }
        }
        tiles
    }

    /// `rows × cols` matrix with the centroid of every included cell
    pub fn centroid_matrix(&self) -> Vec<Vec<Option<Centroid>>> {
        (0..self.plan.rows)
            .map(|row| {
                (0..self.plan.cols)
                    .map(|col| {
                        let centroid = self.plan.cell_centroid(row, col);
                        self.contains(centroid).then_some(centroid)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Tile `boundary` at `tile_size_meters`
pub fn tile(boundary: &Boundary, tile_size_meters: u32) -> Result<Vec<TileFootprint>> {
    Ok(PolygonTiler::new(boundary, tile_size_meters)?.tiles())
}
