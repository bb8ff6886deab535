//! Configuration for the branch indexer.
//!
//! Loaded from YAML. Resolution order used by the CLI:
//! 1. `--config <path>` / `BDX_CONFIG`
//! 2. `~/.bdx/config.yaml`
//! 3. Built-in defaults
//!
//! ```yaml
//! contentBatchSize: 50
//! visibilityBatchSize: 100
//! searchOverfetchFactor: 3
//! visibleScanCap: 10000
//! scrollPageSize: 1000
//! gitTimeoutMs: 5000
//! visibilityPriority: 1
//! chunkMaxLines: 60
//! chunkMaxFileBytes: 1000000
//! embeddingDimension: 256
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::BdxError;

/// Tunables of the indexing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerConfig {
    /// Points accumulated from changed files before a flush.
    #[serde(default = "default_content_batch_size")]
    pub content_batch_size: usize,

    /// Points accumulated from unchanged files before a flush.
    #[serde(default = "default_visibility_batch_size")]
    pub visibility_batch_size: usize,

    /// Similarity candidates fetched per requested result.
    #[serde(default = "default_search_overfetch_factor")]
    pub search_overfetch_factor: usize,

    /// Maximum visibility points read to build a branch's visible set.
    #[serde(default = "default_visible_scan_cap")]
    pub visible_scan_cap: usize,

    /// Page size for whole-collection scrolls (GC, stats).
    #[serde(default = "default_scroll_page_size")]
    pub scroll_page_size: usize,

    /// Timeout for each git invocation, in milliseconds.
    #[serde(default = "default_git_timeout_ms")]
    pub git_timeout_ms: u64,

    /// Priority stamped on new visibility points.
    #[serde(default = "default_visibility_priority")]
    pub visibility_priority: i64,

    /// Lines per chunk for the bundled line chunker.
    #[serde(default = "default_chunk_max_lines")]
    pub chunk_max_lines: usize,

    /// Files larger than this are not chunked.
    #[serde(default = "default_chunk_max_file_bytes")]
    pub chunk_max_file_bytes: u64,

    /// Dimension of the bundled hash embedder.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
}

fn default_content_batch_size() -> usize {
    DEFAULT_CONTENT_BATCH_SIZE
}
fn default_visibility_batch_size() -> usize {
    DEFAULT_VISIBILITY_BATCH_SIZE
}
fn default_search_overfetch_factor() -> usize {
    DEFAULT_SEARCH_OVERFETCH_FACTOR
}
fn default_visible_scan_cap() -> usize {
    DEFAULT_VISIBLE_SCAN_CAP
}
fn default_scroll_page_size() -> usize {
    DEFAULT_SCROLL_PAGE_SIZE
}
fn default_git_timeout_ms() -> u64 {
    DEFAULT_GIT_TIMEOUT_MS
}
fn default_visibility_priority() -> i64 {
    DEFAULT_VISIBILITY_PRIORITY
}
fn default_chunk_max_lines() -> usize {
    DEFAULT_CHUNK_MAX_LINES
}
fn default_chunk_max_file_bytes() -> u64 {
    DEFAULT_CHUNK_MAX_FILE_BYTES
}
fn default_embedding_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            content_batch_size: DEFAULT_CONTENT_BATCH_SIZE,
            visibility_batch_size: DEFAULT_VISIBILITY_BATCH_SIZE,
            search_overfetch_factor: DEFAULT_SEARCH_OVERFETCH_FACTOR,
            visible_scan_cap: DEFAULT_VISIBLE_SCAN_CAP,
            scroll_page_size: DEFAULT_SCROLL_PAGE_SIZE,
            git_timeout_ms: DEFAULT_GIT_TIMEOUT_MS,
            visibility_priority: DEFAULT_VISIBILITY_PRIORITY,
            chunk_max_lines: DEFAULT_CHUNK_MAX_LINES,
            chunk_max_file_bytes: DEFAULT_CHUNK_MAX_FILE_BYTES,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl IndexerConfig {
    /// Load configuration from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, BdxError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, BdxError> {
        let content = std::fs::read_to_string(path).map_err(|e| BdxError::ConfigIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        for warning in config.validate()? {
            tracing::warn!("{}: {}", path.display(), warning);
        }
        Ok(config)
    }

    /// Default configuration path (`~/.bdx/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(BDX_HOME_DIR).join(GLOBAL_CONFIG_FILENAME))
    }

    /// Git timeout as a [`Duration`].
    pub fn git_timeout(&self) -> Duration {
        Duration::from_millis(self.git_timeout_ms)
    }

    /// Validate the configuration, returning warnings for questionable values.
    ///
    /// # Errors
    /// Returns an error for values that would make the indexer misbehave
    /// (zero batch sizes, zero over-fetch factor, zero embedding dimension).
    pub fn validate(&self) -> Result<Vec<String>, BdxError> {
        let positive = [
            ("contentBatchSize", self.content_batch_size),
            ("visibilityBatchSize", self.visibility_batch_size),
            ("searchOverfetchFactor", self.search_overfetch_factor),
            ("scrollPageSize", self.scroll_page_size),
            ("embeddingDimension", self.embedding_dimension),
            ("chunkMaxLines", self.chunk_max_lines),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(BdxError::InvalidConfiguration {
                    message: format!("{} must be greater than 0", name),
                    hint: format!("Remove `{}` to use the default", name),
                });
            }
        }

        let mut warnings = Vec::new();
        if self.git_timeout_ms < 100 {
            warnings.push(format!(
                "gitTimeoutMs={} is very low; git checks will mostly degrade to defaults",
                self.git_timeout_ms
            ));
        }
        if self.visible_scan_cap < 1_000 {
            warnings.push(format!(
                "visibleScanCap={} may hide results on large branches",
                self.visible_scan_cap
            ));
        }
        if self.content_batch_size > 1_000 {
            warnings.push(format!(
                "contentBatchSize={} produces very large store requests",
                self.content_batch_size
            ));
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = IndexerConfig::default();
        assert_eq!(config.content_batch_size, 50);
        assert_eq!(config.visibility_batch_size, 100);
        assert_eq!(config.search_overfetch_factor, 3);
        assert_eq!(config.visible_scan_cap, 10_000);
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "contentBatchSize: 10\ngitTimeoutMs: 2000\n").unwrap();

        let config = IndexerConfig::from_path(&path).unwrap();
        assert_eq!(config.content_batch_size, 10);
        assert_eq!(config.git_timeout(), Duration::from_secs(2));
        assert_eq!(config.visibility_batch_size, 100);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let config = IndexerConfig {
            visibility_batch_size: 0,
            ..IndexerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BdxError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_low_timeout_warns() {
        let config = IndexerConfig {
            git_timeout_ms: 10,
            ..IndexerConfig::default()
        };
        assert_eq!(config.validate().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_config_io_error() {
        let err = IndexerConfig::from_path(Path::new("/nonexistent/bdx.yaml")).unwrap_err();
        assert!(matches!(err, BdxError::ConfigIo { .. }));
    }
}
