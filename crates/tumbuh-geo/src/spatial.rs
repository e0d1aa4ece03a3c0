use geo::{Area, Intersects, LineString, Point, Polygon};
use tumbuh_core::models::{Boundary, Centroid};

/// Meters per degree of latitude (constant approximation)
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Smallest cosine used for longitude conversion near the poles
const MIN_COS_LAT: f64 = 1e-6;

/// Meters per degree of longitude at `lat`
pub fn meters_per_degree_lon(lat: f64) -> f64 {
    METERS_PER_DEGREE_LAT * lat.to_radians().cos().max(MIN_COS_LAT)
}

/// Build a `geo` polygon from a boundary exterior ring
pub fn to_polygon(boundary: &Boundary) -> Polygon<f64> {
    Polygon::new(LineString::from(boundary.exterior.clone()), vec![])
}

/// Build a `geo` polygon from a raw `[lon, lat]` ring
pub fn ring_to_polygon(ring: &[[f64; 2]]) -> Polygon<f64> {
    Polygon::new(LineString::from(ring.to_vec()), vec![])
}

/// Point-in-polygon test; points on the boundary count as inside
pub fn point_in_polygon(polygon: &Polygon<f64>, point: Centroid) -> bool {
    polygon.intersects(&Point::new(point.lon, point.lat))
}

/// Planar area of a boundary in square degrees
pub fn area_square_degrees(boundary: &Boundary) -> f64 {
    to_polygon(boundary).unsigned_area()
}

/// Approximate area of a boundary in square meters, scaled at its center latitude
pub fn approximate_area_m2(boundary: &Boundary) -> f64 {
    let Some(bbox) = boundary.bounding_box() else {
        return 0.0;
    };
    let center = bbox.center();
    area_square_degrees(boundary) * METERS_PER_DEGREE_LAT * meters_per_degree_lon(center.lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Boundary {
        Boundary::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
    }

    #[test]
    fn test_meters_per_degree_lon() {
        assert!((meters_per_degree_lon(0.0) - METERS_PER_DEGREE_LAT).abs() < 1e-6);
        assert!((meters_per_degree_lon(60.0) - METERS_PER_DEGREE_LAT / 2.0).abs() < 1e-6);
        assert!(meters_per_degree_lon(90.0) > 0.0);
    }

    #[test]
    fn test_point_in_polygon_includes_boundary() {
        let polygon = to_polygon(&unit_square());
        assert!(point_in_polygon(&polygon, Centroid::new(0.5, 0.5)));
        assert!(point_in_polygon(&polygon, Centroid::new(0.0, 0.5)));
        assert!(point_in_polygon(&polygon, Centroid::new(1.0, 1.0)));
        assert!(!point_in_polygon(&polygon, Centroid::new(1.5, 0.5)));
    }

    #[test]
    fn test_area() {
        assert!((area_square_degrees(&unit_square()) - 1.0).abs() < 1e-12);

        let collinear = Boundary::new(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        assert_eq!(area_square_degrees(&collinear), 0.0);
    }

    #[test]
    fn test_approximate_area_m2() {
        let side = 100.0 / METERS_PER_DEGREE_LAT;
        let boundary = Boundary::new(vec![[0.0, 0.0], [side, 0.0], [side, side], [0.0, side]]);
        let area = approximate_area_m2(&boundary);
        assert!((area - 10_000.0).abs() < 1.0, "area was {}", area);
    }
}
