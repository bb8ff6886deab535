//! Content addressing.
//!
//! Two independent identifier schemes live here and are deliberately kept
//! apart:
//!
//! - **Commit-scoped ids** ([`commit_scoped_id`]) identify one chunk of one
//!   file at one revision. They are UUIDv5 values, so the same
//!   `(file_path, revision, chunk_index)` maps to the same point id in every
//!   process, which lets many branches sharing a commit reuse one content
//!   point. [`visibility_id`] is the branch-side counterpart used as the
//!   upsert key of visibility points.
//! - **Working-directory ids** ([`working_directory_id`]) identify a whole
//!   file in its current on-disk state. They are built from the revision
//!   when the file matches its committed blob, and from mtime + size
//!   otherwise, so reconcile passes can detect drift from a `stat` alone.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use bdx_db::PointId;

use crate::constants::WORKING_DIR_MARKER;

/// Namespace for every name-based id bdx derives.
const ID_NAMESPACE: Uuid = Uuid::NAMESPACE_DNS;

// ============================================================================
// Commit-scoped ids
// ============================================================================

/// Id of the content point for chunk `chunk_index` of `file_path` at `revision`.
pub fn commit_scoped_id(file_path: &str, revision: &str, chunk_index: usize) -> PointId {
    let key = format!("{}:{}:{}", file_path, revision, chunk_index);
    PointId::new(Uuid::new_v5(&ID_NAMESPACE, key.as_bytes()))
}

/// Id of the visibility point for chunk `chunk_index` of `file_path` on `branch`.
///
/// Independent of content: re-pointing a branch at different content
/// overwrites this same point.
pub fn visibility_id(branch: &str, file_path: &str, chunk_index: usize) -> PointId {
    let key = format!("visibility:{}:{}:{}", branch, file_path, chunk_index);
    PointId::new(Uuid::new_v5(&ID_NAMESPACE, key.as_bytes()))
}

/// SHA-256 of a chunk's text, hex encoded.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// Working-directory ids
// ============================================================================

/// Whether a file's on-disk bytes match its committed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDrift {
    /// The working copy matches the committed blob.
    Committed,
    /// The working copy differs; identified by its stat data.
    Diverged {
        /// Modification time in unix seconds.
        mtime: u64,
        /// File size in bytes.
        byte_size: u64,
    },
}

/// File-level identity of a working-tree state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingDirId(String);

impl WorkingDirId {
    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this id is in the committed-revision form.
    pub fn is_committed_form(&self) -> bool {
        !self.0.contains(&format!(":{}_", WORKING_DIR_MARKER))
    }
}

impl fmt::Display for WorkingDirId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for WorkingDirId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Working-directory id for `file_path`.
///
/// `"{file_path}:{revision}"` when the file matches its committed blob,
/// `"{file_path}:working_dir_{mtime}_{byte_size}"` when it differs.
pub fn working_directory_id(file_path: &str, revision: &str, drift: FileDrift) -> WorkingDirId {
    match drift {
        FileDrift::Committed => WorkingDirId(format!("{}:{}", file_path, revision)),
        FileDrift::Diverged { mtime, byte_size } => WorkingDirId(format!(
            "{}:{}_{}_{}",
            file_path, WORKING_DIR_MARKER, mtime, byte_size
        )),
    }
}
