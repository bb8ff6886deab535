//! Error types for bdx-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bdx-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in bdx-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Collection errors
    // ========================================================================
    /// The requested collection does not exist.
    #[error("Collection not found: {collection}")]
    CollectionNotFound { collection: String },

    /// Collection name cannot be used by this backend.
    #[error("Invalid collection name '{collection}': use ASCII letters, digits, '-', '_' or '.'")]
    InvalidCollectionName { collection: String },

    /// Point vector dimension does not match the collection.
    #[error("Vector dimension mismatch in collection '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    // ========================================================================
    // Persistence errors
    // ========================================================================
    /// Store I/O error.
    #[error("Point store I/O error at {path}: {message}")]
    StoreIo { path: PathBuf, message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a collection-not-found error.
    pub fn collection_not_found(collection: impl Into<String>) -> Self {
        Self::CollectionNotFound {
            collection: collection.into(),
        }
    }

    /// Create a store I/O error.
    pub fn store_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StoreIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
