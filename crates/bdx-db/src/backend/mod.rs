//! Point store backend implementations.
//!
//! ## Available Backends
//!
//! - `simple` (default): in-memory store with optional JSONL persistence

mod simple;

pub use simple::{validate_collection_name, SimplePointStore};

use std::sync::Arc;

use tracing::debug;

use crate::config::PointStoreConfig;
use crate::error::{DbError, DbResult};
use crate::traits::PointStore;

/// Open a point store with the given configuration.
///
/// # Errors
///
/// Returns an error if the backend is unknown or the store directory cannot
/// be created or read.
pub fn open_point_store(config: &PointStoreConfig) -> DbResult<Arc<dyn PointStore>> {
    debug!(
        "Opening point store (backend={}, path={:?})",
        config.backend, config.path
    );

    match config.backend.as_str() {
        "simple" => {
            let store = match &config.path {
                Some(path) => SimplePointStore::open(path, config.metric)?,
                None => SimplePointStore::in_memory(config.metric),
            };
            Ok(Arc::new(store))
        }
        backend => Err(DbError::Internal {
            message: format!(
                "Unknown backend: '{}'. Available backends: {}",
                backend,
                available_backends().join(", ")
            ),
        }),
    }
}

/// Get a list of available backend names.
pub fn available_backends() -> Vec<&'static str> {
    vec!["simple"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_store() {
        let store = open_point_store(&PointStoreConfig::in_memory()).unwrap();
        store.ensure_collection("repo", 4).unwrap();
        assert_eq!(store.count(None, "repo").unwrap(), 0);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let config = PointStoreConfig {
            backend: "qdrant".to_string(),
            ..PointStoreConfig::default()
        };
        let err = open_point_store(&config).err().unwrap();
        assert!(err.to_string().contains("Available backends: simple"));
    }
}
