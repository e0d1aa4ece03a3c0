//! Environmental variable bags returned by the variable provider.
//!
//! Bag contents are opaque structured values keyed by category. The only
//! interpretation the core performs is numeric leaf extraction through a
//! [`MetricPath`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TumbuhError;

/// Variable categories supplied by the geospatial provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableCategory {
    Climate,
    Soil,
    Topography,
    Landcover,
    Seasonal,
    Nighttime,
}

impl VariableCategory {
    pub const ALL: [VariableCategory; 6] = [
        VariableCategory::Climate,
        VariableCategory::Soil,
        VariableCategory::Topography,
        VariableCategory::Landcover,
        VariableCategory::Seasonal,
        VariableCategory::Nighttime,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            VariableCategory::Climate => "climate",
            VariableCategory::Soil => "soil",
            VariableCategory::Topography => "topography",
            VariableCategory::Landcover => "landcover",
            VariableCategory::Seasonal => "seasonal",
            VariableCategory::Nighttime => "nighttime",
        }
    }
}

impl fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from category name to provider-returned value
///
/// Absent categories are simply missing, never null-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableBag(BTreeMap<String, Value>);

impl VariableBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, value: Value) {
        self.0.insert(category.into(), value);
    }

    pub fn get(&self, category: &str) -> Option<&Value> {
        self.0.get(category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Numeric leaf at `path`, if present
    ///
    /// Numbers and numeric strings are accepted; anything else yields `None`.
    pub fn lookup(&self, path: &MetricPath) -> Option<f64> {
        let (first, rest) = path.segments().split_first()?;
        let PathSegment::Key(category) = first else {
            return None;
        };
        let mut current = self.0.get(category)?;
        for segment in rest {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        match current {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

impl From<BTreeMap<String, Value>> for VariableBag {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for VariableBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One step of a metric path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Dot-separated path into a variable bag, e.g. `climate.data.0.temp_mean_c`
///
/// Purely numeric segments index arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricPath(Vec<PathSegment>);

impl MetricPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl FromStr for MetricPath {
    type Err = TumbuhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(TumbuhError::validation("metric_path", "path cannot be empty"));
        }
        let segments = s
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    return Err(TumbuhError::validation(
                        "metric_path",
                        format!("empty segment in '{}'", s),
                    ));
                }
                Ok(match part.parse::<usize>() {
                    Ok(i) => PathSegment::Index(i),
                    Err(_) => PathSegment::Key(part.to_string()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MetricPath(segments))
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}
