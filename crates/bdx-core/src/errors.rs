//! Error types for bdx-core.

use std::path::PathBuf;

use thiserror::Error;

use bdx_db::DbError;

/// Domain-specific errors for bdx operations.
#[derive(Error, Debug)]
pub enum BdxError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file could not be read.
    #[error("Config not readable at `{path}`: {message}")]
    ConfigIo {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    // =========================================================================
    // Indexing Errors
    // =========================================================================
    /// Chunking a file failed.
    #[error("Failed to chunk `{path}`: {reason}")]
    Chunking {
        /// File that could not be chunked.
        path: String,
        /// Description of the failure.
        reason: String,
    },

    /// Embedding a chunk failed.
    #[error("Embedding failed for model `{model}`: {reason}")]
    Embedding {
        /// The model that failed.
        model: String,
        /// Description of the failure.
        reason: String,
    },

    /// A stored point is missing a payload field the indexer relies on.
    #[error("Point {id} is missing payload field `{field}`")]
    MalformedPoint {
        /// The point id.
        id: String,
        /// The missing field.
        field: String,
    },

    /// Invalid branch name.
    #[error("Invalid branch name `{0}`: branch names must be non-empty and contain no whitespace.")]
    InvalidBranchName(String),

    /// Another operation currently holds the lease for this collection.
    #[error("Collection `{collection}` is busy: another branch operation is running. Retry once it finishes.")]
    CollectionBusy {
        /// The collection that is locked.
        collection: String,
    },

    /// A git query the operation depends on produced no answer.
    #[error("git could not {operation}. Check that the repository root is a git work tree, or pass the file lists explicitly.")]
    GitUnavailable {
        /// What was being asked of git.
        operation: String,
    },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// Point store error.
    #[error("Point store error: {0}")]
    Store(#[from] DbError),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
