//! Tumbuh Geo - Boundary normalization, spatial helpers and polygon tiling
//!
//! This crate turns submitted GeoJSON into a validated boundary and
//! partitions that boundary into a regular grid of tiles.

pub mod boundary;
pub mod spatial;
pub mod tiler;
pub mod validation;

pub use boundary::parse_boundary;
pub use tiler::{count_inside, tile, GridPlan, PolygonTiler};
