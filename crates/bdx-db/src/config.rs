//! Point store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::point::VectorMetric;

/// Default store backend.
pub const DEFAULT_BACKEND: &str = "simple";

/// Configuration used to open a point store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointStoreConfig {
    /// Backend name (currently only `simple`).
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory for persisted collections; `None` keeps everything in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Similarity metric used for search.
    #[serde(default)]
    pub metric: VectorMetric,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

impl Default for PointStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            metric: VectorMetric::default(),
        }
    }
}

impl PointStoreConfig {
    /// Configuration for a store persisted under `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Configuration for a purely in-memory store.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Set the similarity metric.
    pub fn with_metric(mut self, metric: VectorMetric) -> Self {
        self.metric = metric;
        self
    }
}
