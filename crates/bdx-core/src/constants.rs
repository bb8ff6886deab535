//! Common constants used throughout bdx-core.

// ============================================================================
// Revisions
// ============================================================================

/// Revision recorded when the commit touching a file cannot be determined.
///
/// Callers must accept this as a valid revision value: content indexed
/// under it is addressed like any other revision.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Marker embedded in working-directory ids for files that differ from
/// their committed blob.
pub const WORKING_DIR_MARKER: &str = "working_dir";

// ============================================================================
// Locations
// ============================================================================

/// Lock directory used when no store directory is configured, relative to
/// the repository root.
pub const DEFAULT_LOCK_DIR: &str = ".bdx/locks";

// ============================================================================
// Point Types
// ============================================================================

/// `type` payload value of content points.
pub const POINT_TYPE_CONTENT: &str = "content";

/// `type` payload value of visibility points.
pub const POINT_TYPE_VISIBILITY: &str = "visibility";

// ============================================================================
// Payload Field Names
// ============================================================================

/// Payload keys persisted on points.
///
/// Other components read these names directly from the store, so they are a
/// wire contract and must not be renamed.
pub mod fields {
    /// Point type discriminator (`content` or `visibility`).
    pub const TYPE: &str = "type";
    /// Repository-relative file path.
    pub const PATH: &str = "path";
    /// Zero-based chunk index within the file.
    pub const CHUNK_INDEX: &str = "chunk_index";
    /// Number of chunks the file produced.
    pub const TOTAL_CHUNKS: &str = "total_chunks";
    /// Revision the content was indexed at.
    pub const GIT_COMMIT: &str = "git_commit";
    /// Same value as [`GIT_COMMIT`], kept for readers using the long name.
    pub const GIT_COMMIT_HASH: &str = "git_commit_hash";
    /// SHA-256 of the chunk text.
    pub const CONTENT_HASH: &str = "content_hash";
    /// Size of the file in bytes.
    pub const FILE_SIZE: &str = "file_size";
    /// Detected language of the file.
    pub const LANGUAGE: &str = "language";
    /// Creation timestamp (RFC 3339).
    pub const CREATED_AT: &str = "created_at";
    /// Working-tree status of the file when indexed.
    pub const WORKING_DIRECTORY_STATUS: &str = "working_directory_status";
    /// File modification time (unix seconds) when indexed.
    pub const FILE_MTIME: &str = "file_mtime";
    /// Whether git was usable when the content was indexed.
    pub const GIT_AVAILABLE: &str = "git_available";
    /// Duplicate of [`PATH`] kept for readers using the long name.
    pub const FILE_PATH: &str = "file_path";
    /// Raw chunk text.
    pub const CONTENT: &str = "content";
    /// Indexing timestamp (RFC 3339).
    pub const INDEXED_AT: &str = "indexed_at";
    /// Branch of a visibility point.
    pub const BRANCH: &str = "branch";
    /// Content point id a visibility point resolves to.
    pub const CONTENT_ID: &str = "content_id";
    /// Visibility status (`visible` or `hidden`).
    pub const STATUS: &str = "status";
    /// Visibility priority.
    pub const PRIORITY: &str = "priority";
}

// ============================================================================
// Defaults
// ============================================================================

/// Points accumulated while processing changed files before a flush.
pub const DEFAULT_CONTENT_BATCH_SIZE: usize = 50;

/// Points accumulated while copying visibility for unchanged files before a flush.
pub const DEFAULT_VISIBILITY_BATCH_SIZE: usize = 100;

/// Over-fetch multiplier applied to similarity searches before branch filtering.
pub const DEFAULT_SEARCH_OVERFETCH_FACTOR: usize = 3;

/// Upper bound on visibility points read when building a branch's visible set.
pub const DEFAULT_VISIBLE_SCAN_CAP: usize = 10_000;

/// Page size used when scrolling whole collections.
pub const DEFAULT_SCROLL_PAGE_SIZE: usize = 1_000;

/// Timeout for a single git invocation, in milliseconds.
pub const DEFAULT_GIT_TIMEOUT_MS: u64 = 5_000;

/// Priority stamped on new visibility points.
pub const DEFAULT_VISIBILITY_PRIORITY: i64 = 1;

/// Lines per chunk for the bundled line chunker.
pub const DEFAULT_CHUNK_MAX_LINES: usize = 60;

/// Files larger than this are not chunked.
pub const DEFAULT_CHUNK_MAX_FILE_BYTES: u64 = 1_000_000;

/// Dimension of the bundled hash embedder.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 256;

/// Name of the bdx home directory (`~/.bdx`).
pub const BDX_HOME_DIR: &str = ".bdx";

/// Name of the global configuration file inside [`BDX_HOME_DIR`].
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";
