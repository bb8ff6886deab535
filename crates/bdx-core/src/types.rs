//! Common types used throughout bdx.
//!
//! Progress events, cancellation control and the result types returned by
//! the indexer, search and lifecycle operations.

use serde::{Deserialize, Serialize};

use bdx_db::PointId;

// ============================================================================
// Progress
// ============================================================================

/// Progress report emitted after each file of a branch switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 1-based index of the file just handled.
    pub current: usize,
    /// Total number of files (changed + unchanged).
    pub total: usize,
    /// The file just handled.
    pub file_path: String,
    /// Informational note (deleted file, nothing to index, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Error message when the file failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Returned by a progress callback to continue or stop a branch switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressControl {
    #[default]
    Continue,
    /// Stop after the current file; pending writes are still flushed.
    Interrupt,
}

/// Callback invoked after each file.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(&ProgressEvent) -> ProgressControl;

// ============================================================================
// Results
// ============================================================================

/// Counters reported by a branch switch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchIndexResult {
    /// Content points written for new (file, revision, chunk) keys.
    pub content_points_created: usize,
    /// Visibility points written under a new id.
    pub visibility_points_created: usize,
    /// Visibility points overwritten in place.
    pub visibility_points_updated: usize,
    /// Existing content points referenced instead of re-embedded.
    pub content_points_reused: usize,
    /// Visibility points hidden because their file was deleted.
    pub visibility_points_hidden: usize,
    /// Files handled without error.
    pub files_processed: usize,
    /// Files that failed and were skipped.
    pub files_failed: usize,
    /// Wall-clock duration in seconds.
    pub processing_time: f64,
    /// Whether the caller interrupted the run.
    pub interrupted: bool,
}

/// A search hit visible on the requested branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResult {
    pub id: PointId,
    pub score: f32,
    pub file_path: String,
    pub chunk_index: usize,
    pub revision: String,
    pub language: String,
    pub content: String,
}

/// Result of hiding a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    pub visibility_points_hidden: usize,
}

/// Result of a content garbage-collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcResult {
    /// Orphaned content points removed.
    pub content_points_deleted: usize,
    /// Content points still referenced by a visible visibility point.
    pub content_points_preserved: usize,
}

/// Point counts of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub collection: String,
    pub content_points: usize,
    pub visible_points: usize,
    pub hidden_points: usize,
    /// Branches with at least one visibility point, sorted.
    pub branches: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_skips_empty_notes() {
        let event = ProgressEvent {
            current: 1,
            total: 2,
            file_path: "a.py".into(),
            info: None,
            error: Some("boom".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["filePath"], "a.py");
        assert_eq!(json["error"], "boom");
        assert!(json.get("info").is_none());
    }

    #[test]
    fn test_progress_control_defaults_to_continue() {
        assert_eq!(ProgressControl::default(), ProgressControl::Continue);
    }
}
