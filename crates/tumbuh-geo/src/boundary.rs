//! GeoJSON input normalization.
//!
//! Callers may submit a bare geometry, a Feature or a FeatureCollection. The
//! boundary used for tiling is the exterior ring of the submitted polygon, or
//! of the largest polygon when several are present.

use geo::Area;
use geojson::{GeoJson, Geometry, Value as GeometryValue};
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::Boundary;

use crate::spatial::ring_to_polygon;
use crate::validation::{validate_ring, ValidationResult};

type Ring = Vec<[f64; 2]>;

/// Parse and validate a submitted GeoJSON value into a tiling boundary
pub fn parse_boundary(value: &serde_json::Value) -> Result<Boundary> {
    if value.is_null() {
        return Err(TumbuhError::validation("geometry", "geometry is required"));
    }

    let geojson = GeoJson::from_json_value(value.clone())
        .map_err(|e| TumbuhError::validation("geometry", format!("invalid GeoJSON: {}", e)))?;

    let mut rings = Vec::new();
    match geojson {
        GeoJson::Geometry(geometry) => collect_rings(&geometry, &mut rings)?,
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                collect_rings(geometry, &mut rings)?;
            }
        }
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                if let Some(geometry) = &feature.geometry {
                    collect_rings(geometry, &mut rings)?;
                }
            }
        }
    }

    if rings.is_empty() {
        return Err(TumbuhError::validation("geometry", "no polygon found in GeoJSON input"));
    }

    let mut result = ValidationResult::valid();
    for (i, ring) in rings.iter().enumerate() {
        result.absorb(&format!("polygon[{}]", i), validate_ring(ring));
    }
    result.into_result("geometry")?;

    let largest = select_largest(rings);
    Ok(Boundary::new(largest))
}

fn collect_rings(geometry: &Geometry, out: &mut Vec<Ring>) -> Result<()> {
    match &geometry.value {
        GeometryValue::Polygon(polygon) => {
            out.push(exterior_ring(polygon)?);
        }
        GeometryValue::MultiPolygon(polygons) => {
            for polygon in polygons {
                out.push(exterior_ring(polygon)?);
            }
        }
        GeometryValue::GeometryCollection(geometries) => {
            for inner in geometries {
                collect_rings(inner, out)?;
            }
        }
        other => {
            return Err(TumbuhError::validation(
                "geometry",
                format!("expected Polygon or MultiPolygon, got {}", geometry_type(other)),
            ));
        }
    }
    Ok(())
}

fn geometry_type(value: &GeometryValue) -> &'static str {
    match value {
        GeometryValue::Point(_) => "Point",
        GeometryValue::MultiPoint(_) => "MultiPoint",
        GeometryValue::LineString(_) => "LineString",
        GeometryValue::MultiLineString(_) => "MultiLineString",
        GeometryValue::Polygon(_) => "Polygon",
        GeometryValue::MultiPolygon(_) => "MultiPolygon",
        GeometryValue::GeometryCollection(_) => "GeometryCollection",
    }
}

fn exterior_ring(polygon: &[Vec<Vec<f64>>]) -> Result<Ring> {
    let exterior = polygon
        .first()
        .ok_or_else(|| TumbuhError::validation("geometry", "polygon has no exterior ring"))?;

    let mut ring: Ring = Vec::with_capacity(exterior.len() + 1);
    for position in exterior {
        match position.as_slice() {
            [lon, lat, ..] => ring.push([*lon, *lat]),
            _ => {
                return Err(TumbuhError::validation(
                    "geometry",
                    "each position needs longitude and latitude",
                ))
            }
        }
    }

    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    Ok(ring)
}

/// Largest ring by planar area; the first one wins ties
fn select_largest(rings: Vec<Ring>) -> Ring {
    let mut best: Option<(f64, Ring)> = None;
    for ring in rings {
        let area = ring_to_polygon(&ring).unsigned_area();
        match &best {
            Some((best_area, _)) if area <= *best_area => {}
            _ => best = Some((area, ring)),
        }
    }
    best.map(|(_, ring)| ring).unwrap_or_default()
}
