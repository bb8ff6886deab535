//! Point types shared by all store backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// JSON payload attached to a point.
pub type Payload = Map<String, Value>;

// ============================================================================
// PointId
// ============================================================================

/// Identifier of a point in a collection.
///
/// Ids are UUIDs so that callers can derive them deterministically
/// (name-based) and still land in the store's identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(pub Uuid);

impl PointId {
    /// Wrap an existing UUID.
    pub fn new(id: Uuid) -> Self {
        PointId(id)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for PointId {
    fn from(id: Uuid) -> Self {
        PointId(id)
    }
}

impl FromStr for PointId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(PointId)
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// VectorMetric
// ============================================================================

/// Distance metric for vector similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// Cosine similarity (default).
    #[default]
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean (L2) distance.
    L2,
}

impl VectorMetric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "cosine",
            VectorMetric::Dot => "dot",
            VectorMetric::L2 => "l2",
        }
    }
}

impl fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VectorMetric {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "dot" => Self::Dot,
            "l2" | "euclidean" => Self::L2,
            _ => Self::Cosine,
        })
    }
}

// ============================================================================
// Point
// ============================================================================

/// A stored point: id, vector and JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Unique identifier within the collection.
    pub id: PointId,

    /// The embedding vector.
    pub vector: Vec<f32>,

    /// Payload fields used for filtering and display.
    #[serde(default)]
    pub payload: Payload,
}

impl Point {
    /// Create a new point.
    pub fn new(id: impl Into<PointId>, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Look up a string payload field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Look up an unsigned integer payload field.
    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(Value::as_u64)
    }
}

// ============================================================================
// ScoredPoint
// ============================================================================

/// A single result from a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Identifier of the matched point.
    pub id: PointId,

    /// Similarity score (higher is better for every metric).
    pub score: f32,

    /// Payload of the matched point.
    pub payload: Payload,
}

impl ScoredPoint {
    /// Create a new search result.
    pub fn new(id: impl Into<PointId>, score: f32, payload: Payload) -> Self {
        Self {
            id: id.into(),
            score,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_round_trips_through_string() {
        let id = PointId::new(Uuid::new_v4());
        let parsed: PointId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_vector_metric_from_str() {
        assert_eq!("DOT".parse::<VectorMetric>().unwrap(), VectorMetric::Dot);
        assert_eq!("euclidean".parse::<VectorMetric>().unwrap(), VectorMetric::L2);
        assert_eq!("whatever".parse::<VectorMetric>().unwrap(), VectorMetric::Cosine);
    }

    #[test]
    fn test_point_field_accessors() {
        let mut payload = Payload::new();
        payload.insert("path".into(), Value::from("src/lib.rs"));
        payload.insert("chunk_index".into(), Value::from(2u64));
        let point = Point::new(Uuid::nil(), vec![0.0; 3], payload);

        assert_eq!(point.str_field("path"), Some("src/lib.rs"));
        assert_eq!(point.u64_field("chunk_index"), Some(2));
        assert!(point.field("missing").is_none());
    }
}
