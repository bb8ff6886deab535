//! Payload filters for search, scroll and bulk update.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::point::Payload;

// ============================================================================
// FieldCondition
// ============================================================================

/// Exact-match condition on a single payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Payload key to test.
    pub key: String,

    /// Value the field must equal.
    pub value: Value,
}

impl FieldCondition {
    /// Create a new exact-match condition.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn matches(&self, payload: &Payload) -> bool {
        payload.get(&self.key) == Some(&self.value)
    }
}

// ============================================================================
// PointFilter
// ============================================================================

/// Filter criteria for store queries.
///
/// All `must` conditions are combined with AND logic; `must_not` conditions
/// exclude any point they match. An empty filter matches every point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointFilter {
    /// Conditions that must all hold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<FieldCondition>,

    /// Conditions that must not hold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<FieldCondition>,
}

impl PointFilter {
    /// Create an empty filter (matches all).
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key == value`.
    pub fn must_match(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must.push(FieldCondition::new(key, value));
        self
    }

    /// Exclude points where `key == value`.
    pub fn must_not_match(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must_not.push(FieldCondition::new(key, value));
        self
    }

    /// Check if the filter is empty (matches all).
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    /// Check whether a payload satisfies this filter.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|c| c.matches(payload))
            && !self.must_not.iter().any(|c| c.matches(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = PointFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&payload(json!({"type": "content"}))));
        assert!(filter.matches(&Payload::new()));
    }

    #[test]
    fn test_must_conditions_are_anded() {
        let filter = PointFilter::new()
            .must_match("type", "visibility")
            .must_match("branch", "main");

        assert!(filter.matches(&payload(json!({"type": "visibility", "branch": "main"}))));
        assert!(!filter.matches(&payload(json!({"type": "visibility", "branch": "dev"}))));
        assert!(!filter.matches(&payload(json!({"branch": "main"}))));
    }

    #[test]
    fn test_must_not_excludes() {
        let filter = PointFilter::new()
            .must_match("type", "visibility")
            .must_not_match("status", "hidden");

        assert!(filter.matches(&payload(json!({"type": "visibility", "status": "visible"}))));
        assert!(!filter.matches(&payload(json!({"type": "visibility", "status": "hidden"}))));
    }

    #[test]
    fn test_numeric_values_compare_exactly() {
        let filter = PointFilter::new().must_match("chunk_index", 0u64);
        assert!(filter.matches(&payload(json!({"chunk_index": 0}))));
        assert!(!filter.matches(&payload(json!({"chunk_index": 1}))));
    }
}
