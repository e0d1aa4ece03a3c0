//! Geographic primitives shared across the tumbuh crates.
//!
//! All coordinates are WGS 84 degrees. Rings use GeoJSON axis order
//! (`[lon, lat]`) so they round-trip with submitted geometries unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A point in geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
}

impl Centroid {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Axis-aligned rectangle in geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self { min_lat, min_lon, max_lat, max_lon }
    }

    /// Latitude span in degrees
    pub fn height_degrees(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span in degrees
    pub fn width_degrees(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn center(&self) -> Centroid {
        Centroid::new((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }

    /// Closed exterior ring in `[lon, lat]` order, counter-clockwise from the south-west corner
    pub fn ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.min_lon, self.min_lat],
            [self.max_lon, self.min_lat],
            [self.max_lon, self.max_lat],
            [self.min_lon, self.max_lat],
            [self.min_lon, self.min_lat],
        ]
    }

    /// GeoJSON Polygon for this rectangle
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [self.ring()],
        })
    }
}

/// Exterior ring of an area boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Closed ring of `[lon, lat]` vertices
    pub exterior: Vec<[f64; 2]>,
}

impl Boundary {
    /// Create a boundary, closing the ring if the caller left it open
    pub fn new(mut exterior: Vec<[f64; 2]>) -> Self {
        if let (Some(first), Some(last)) = (exterior.first().copied(), exterior.last().copied()) {
            if first != last {
                exterior.push(first);
            }
        }
        Self { exterior }
    }

    /// Number of distinct vertices (the closing vertex is not counted twice)
    pub fn distinct_vertex_count(&self) -> usize {
        count_distinct_vertices(&self.exterior)
    }

    /// Bounding box of the ring, `None` when the ring is empty
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.exterior.first()?;
        let mut bbox = BoundingBox::new(first[1], first[0], first[1], first[0]);
        for [lon, lat] in &self.exterior {
            bbox.min_lat = bbox.min_lat.min(*lat);
            bbox.max_lat = bbox.max_lat.max(*lat);
            bbox.min_lon = bbox.min_lon.min(*lon);
            bbox.max_lon = bbox.max_lon.max(*lon);
        }
        Some(bbox)
    }

    /// GeoJSON Polygon for this boundary
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [self.exterior],
        })
    }
}

/// Number of distinct `[lon, lat]` positions in `ring`, in linear time
///
/// Positions compare by value, so `0.0` and `-0.0` are the same vertex.
pub fn count_distinct_vertices(ring: &[[f64; 2]]) -> usize {
    let key = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
    ring.iter().map(|[lon, lat]| [key(*lon), key(*lat)]).collect::<HashSet<[u64; 2]>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_closes_ring() {
        let boundary = Boundary::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
        assert_eq!(boundary.exterior.len(), 4);
        assert_eq!(boundary.exterior.first(), boundary.exterior.last());
        assert_eq!(boundary.distinct_vertex_count(), 3);
    }

    #[test]
    fn test_distinct_vertices_treat_signed_zero_as_equal() {
        assert_eq!(count_distinct_vertices(&[[0.0, 1.0], [-0.0, 1.0], [0.0, 1.0]]), 1);
        assert_eq!(count_distinct_vertices(&[]), 0);
    }

    #[test]
    fn test_distinct_vertex_count_scales_to_large_rings() {
        let n = 60_000;
        let ring: Vec<[f64; 2]> = (0..n)
            .map(|i| {
                let angle = i as f64 / n as f64 * std::f64::consts::TAU;
                [107.0 + 0.01 * angle.cos(), -6.5 + 0.01 * angle.sin()]
            })
            .collect();
        let boundary = Boundary::new(ring);

        let started = std::time::Instant::now();
        assert_eq!(boundary.distinct_vertex_count(), n);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_boundary_bounding_box() {
        let boundary = Boundary::new(vec![
            [107.0, -6.53],
            [107.001, -6.53],
            [107.001, -6.529],
            [107.0, -6.529],
            [107.0, -6.53],
        ]);
        let bbox = boundary.bounding_box().unwrap();
        assert_eq!(bbox.min_lat, -6.53);
        assert_eq!(bbox.max_lat, -6.529);
        assert_eq!(bbox.min_lon, 107.0);
        assert_eq!(bbox.max_lon, 107.001);
    }

    #[test]
    fn test_empty_boundary_has_no_bounding_box() {
        assert!(Boundary::new(vec![]).bounding_box().is_none());
    }

    #[test]
    fn test_bounding_box_geojson_is_closed_polygon() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 2.0);
        let json = bbox.to_geojson();
        assert_eq!(json["type"], "Polygon");
        let ring = json["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(bbox.center(), Centroid::new(0.5, 1.0));
    }
}
