//! Typed payloads of content and visibility points.
//!
//! Field names follow the persisted wire contract in
//! [`constants::fields`](crate::constants::fields).

use std::fmt;

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bdx_db::{Payload, Point, PointId};

use crate::constants::{POINT_TYPE_CONTENT, POINT_TYPE_VISIBILITY};
use crate::errors::BdxError;
use crate::git::WorkingDirStatus;

// ============================================================================
// VisibilityStatus
// ============================================================================

/// Whether a branch currently sees a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityStatus {
    /// The branch sees the referenced content.
    Visible,
    /// Soft-deleted: kept for reuse but excluded from search.
    Hidden,
}

impl VisibilityStatus {
    /// Get the status as a payload string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

impl fmt::Display for VisibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ContentPayload
// ============================================================================

/// Payload of an immutable content point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPayload {
    /// Always `"content"`.
    #[serde(rename = "type")]
    pub point_type: String,
    pub path: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub git_commit: String,
    pub git_commit_hash: String,
    pub content_hash: String,
    pub file_size: u64,
    pub language: String,
    pub created_at: String,
    pub working_directory_status: WorkingDirStatus,
    pub file_mtime: u64,
    pub git_available: bool,
    pub file_path: String,
    pub content: String,
    pub indexed_at: String,
}

impl ContentPayload {
    /// Read the payload of a stored content point.
    pub fn from_point(point: &Point) -> Result<Self, BdxError> {
        from_payload(&point.payload)
    }

    /// Read a payload map returned by a search.
    pub fn from_payload(payload: &Payload) -> Result<Self, BdxError> {
        from_payload(payload)
    }

    /// Convert into a store payload.
    pub fn to_payload(&self) -> Result<Payload, BdxError> {
        to_payload(self)
    }

    /// Type tag used for content points.
    pub fn point_type() -> String {
        POINT_TYPE_CONTENT.to_string()
    }
}

// ============================================================================
// VisibilityPayload
// ============================================================================

/// Payload of a mutable visibility point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityPayload {
    /// Always `"visibility"`.
    #[serde(rename = "type")]
    pub point_type: String,
    pub branch: String,
    pub path: String,
    pub chunk_index: usize,
    pub content_id: PointId,
    pub status: VisibilityStatus,
    pub priority: i64,
    pub created_at: String,
}

impl VisibilityPayload {
    /// Create a visible mapping of `branch`/`path`/`chunk_index` to `content_id`.
    pub fn visible(
        branch: impl Into<String>,
        path: impl Into<String>,
        chunk_index: usize,
        content_id: PointId,
        priority: i64,
    ) -> Self {
        Self {
            point_type: POINT_TYPE_VISIBILITY.to_string(),
            branch: branch.into(),
            path: path.into(),
            chunk_index,
            content_id,
            status: VisibilityStatus::Visible,
            priority,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Read the payload of a stored visibility point.
    pub fn from_point(point: &Point) -> Result<Self, BdxError> {
        from_payload(&point.payload)
    }

    /// Convert into a store payload.
    pub fn to_payload(&self) -> Result<Payload, BdxError> {
        to_payload(self)
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Payload, BdxError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(BdxError::Other(anyhow!(
            "payload serialized to a non-object value: {}",
            other
        ))),
    }
}

fn from_payload<T: DeserializeOwned>(payload: &Payload) -> Result<T, BdxError> {
    Ok(serde_json::from_value(Value::Object(payload.clone()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::commit_scoped_id;

    #[test]
    fn test_visibility_payload_wire_names() {
        let content_id = commit_scoped_id("a.py", "c1", 0);
        let payload = VisibilityPayload::visible("main", "a.py", 0, content_id, 1)
            .to_payload()
            .unwrap();

        assert_eq!(payload["type"], "visibility");
        assert_eq!(payload["branch"], "main");
        assert_eq!(payload["path"], "a.py");
        assert_eq!(payload["chunk_index"], 0);
        assert_eq!(payload["content_id"], content_id.to_string());
        assert_eq!(payload["status"], "visible");
        assert_eq!(payload["priority"], 1);
        assert!(payload.contains_key("created_at"));
    }

    #[test]
    fn test_content_payload_round_trip_ignores_extra_fields() {
        let content = ContentPayload {
            point_type: ContentPayload::point_type(),
            path: "a.py".into(),
            chunk_index: 0,
            total_chunks: 1,
            git_commit: "c1".into(),
            git_commit_hash: "c1".into(),
            content_hash: "h".into(),
            file_size: 10,
            language: "python".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            working_directory_status: WorkingDirStatus::Committed,
            file_mtime: 1,
            git_available: true,
            file_path: "a.py".into(),
            content: "x = 1".into(),
            indexed_at: "2024-01-01T00:00:00Z".into(),
        };

        let mut payload = content.to_payload().unwrap();
        assert_eq!(payload["type"], "content");
        assert_eq!(payload["working_directory_status"], "committed");
        payload.insert("embedding_model".into(), Value::from("m"));

        let back = ContentPayload::from_payload(&payload).unwrap();
        assert_eq!(back, content);
    }
}
