use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::count_distinct_vertices;

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// Merge errors from another result under a location prefix
    pub fn absorb(&mut self, prefix: &str, other: ValidationResult) {
        for error in other.errors {
            self.add_error(format!("{}.{}", prefix, error.location), error.reason);
        }
    }

    /// Convert into a `Validation` error for `field` carrying every reason
    pub fn into_result(self, field: &str) -> Result<()> {
        if self.is_valid {
            return Ok(());
        }
        let reason = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.location, e.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Err(TumbuhError::validation(field, reason))
    }
}

/// Validate a closed `[lon, lat]` exterior ring
pub fn validate_ring(ring: &[[f64; 2]]) -> ValidationResult {
    let mut result = ValidationResult::valid();

    for (i, [lon, lat]) in ring.iter().enumerate() {
        if !lon.is_finite() || !lat.is_finite() {
            result.add_error(format!("ring[{}]", i), "Coordinates must be finite".to_string());
            continue;
        }
        if !(-90.0..=90.0).contains(lat) {
            result.add_error(
                format!("ring[{}]", i),
                format!("Latitude {} is outside [-90, 90]", lat),
            );
        }
        if !(-180.0..=180.0).contains(lon) {
            result.add_error(
                format!("ring[{}]", i),
                format!("Longitude {} is outside [-180, 180]", lon),
            );
        }
    }

    let distinct = count_distinct_vertices(ring);
    if distinct < 3 {
        result.add_error(
            "ring".to_string(),
            format!("Polygon must have at least 3 distinct vertices, found {}", distinct),
        );
    }

    result
}
