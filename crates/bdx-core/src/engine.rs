//! bdx engine: the façade the CLI drives.
//!
//! [`IndexEngine`] owns the collaborators of one repository (point store,
//! embedder, chunker, git CLI, configuration) and exposes the branch
//! operations by collection name. Mutating operations hold a
//! [`CollectionLease`](crate::lock::CollectionLease) while they run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use bdx_db::PointStore;

use crate::addressing::WorkingDirId;
use crate::chunker::{LineChunker, TextChunker};
use crate::config::IndexerConfig;
use crate::constants::DEFAULT_LOCK_DIR;
use crate::embedding::{EmbeddingProvider, HashEmbedder};
use crate::errors::BdxError;
use crate::git::{GitCli, RevisionSource, WorkingDirStatus};
use crate::indexer::BranchIndexer;
use crate::lifecycle;
use crate::lock::{CollectionLease, CollectionLocks};
use crate::search::search_with_branch_context;
use crate::types::{
    BranchIndexResult, CleanupResult, CollectionStats, ContentResult, GcResult, ProgressCallback,
};

// ============================================================================
// Supporting Types
// ============================================================================

/// Files of a branch switch split by whether their content changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchPlan {
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Working-tree state of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub file_path: String,
    pub revision: String,
    pub status: WorkingDirStatus,
    pub differs_from_committed: bool,
    pub working_dir_id: String,
}

// ============================================================================
// IndexEngine
// ============================================================================

/// Branch-aware indexing for one repository.
///
/// # Example
///
/// ```ignore
/// use bdx_core::{IndexEngine, IndexerConfig};
/// use bdx_db::{open_point_store, PointStoreConfig};
///
/// let store = open_point_store(&PointStoreConfig::persistent(".bdx/store"))?;
/// let engine = IndexEngine::new(".", store, IndexerConfig::load_default()?);
/// let plan = engine.plan_switch("main", "feature")?;
/// engine.switch_branch("main", "feature", &plan.changed, &plan.unchanged, "repo", None)?;
/// let hits = engine.search("parse config", "feature", 10, "repo")?;
/// ```
pub struct IndexEngine {
    store: Arc<dyn PointStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn TextChunker>,
    git: GitCli,
    config: IndexerConfig,
    locks: CollectionLocks,
}

impl IndexEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create an engine with the bundled hash embedder and line chunker.
    pub fn new(
        repo_root: impl Into<PathBuf>,
        store: Arc<dyn PointStore>,
        config: IndexerConfig,
    ) -> Self {
        let repo_root = repo_root.into();
        let locks = CollectionLocks::new(repo_root.join(DEFAULT_LOCK_DIR));
        let git = GitCli::new(repo_root).with_timeout(config.git_timeout());
        Self {
            store,
            embedder: Arc::new(HashEmbedder::new(config.embedding_dimension)),
            chunker: Arc::new(LineChunker::new(
                config.chunk_max_lines,
                config.chunk_max_file_bytes,
            )),
            git,
            config,
            locks,
        }
    }

    /// Use a different embedding provider.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Use a different chunker.
    pub fn with_chunker(mut self, chunker: Arc<dyn TextChunker>) -> Self {
        self.chunker = chunker;
        self
    }

    /// Keep collection lock files somewhere else, typically the store directory.
    pub fn with_locks(mut self, locks: CollectionLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn repo_root(&self) -> &Path {
        self.git.repo_root()
    }

    pub fn git(&self) -> &GitCli {
        &self.git
    }

    pub fn locks(&self) -> &CollectionLocks {
        &self.locks
    }

    // -------------------------------------------------------------------------
    // Branch Operations
    // -------------------------------------------------------------------------

    /// Split the tracked files of the checked-out tree into files that
    /// changed between `old_branch` and `new_branch` and files that did not.
    ///
    /// Files removed by the switch are listed as changed so the indexer
    /// hides them.
    pub fn plan_switch(&self, old_branch: &str, new_branch: &str) -> Result<SwitchPlan, BdxError> {
        let changed = self
            .git
            .changed_files_between(old_branch, new_branch)
            .ok_or_else(|| BdxError::GitUnavailable {
                operation: format!("diff '{}' against '{}'", old_branch, new_branch),
            })?;
        let tracked = self
            .git
            .tracked_files()
            .ok_or_else(|| BdxError::GitUnavailable {
                operation: "list tracked files".to_string(),
            })?;

        let changed_set: HashSet<&str> = changed.iter().map(String::as_str).collect();
        let unchanged = tracked
            .into_iter()
            .filter(|f| !changed_set.contains(f.as_str()))
            .collect();

        debug!(
            "Planned switch '{}' -> '{}': {} changed",
            old_branch,
            new_branch,
            changed.len()
        );
        Ok(SwitchPlan { changed, unchanged })
    }

    /// Index a branch switch under a lease on `collection`.
    pub fn switch_branch(
        &self,
        old_branch: &str,
        new_branch: &str,
        changed_files: &[String],
        unchanged_files: &[String],
        collection: &str,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<BranchIndexResult, BdxError> {
        let _lease = self.lease(collection)?;
        self.indexer().index_branch_changes(
            old_branch,
            new_branch,
            changed_files,
            unchanged_files,
            collection,
            progress,
        )
    }

    /// Embed `query` and search the content visible on `branch`.
    pub fn search(
        &self,
        query: &str,
        branch: &str,
        limit: usize,
        collection: &str,
    ) -> Result<Vec<ContentResult>, BdxError> {
        let vector = self.embedder.embed(query)?;
        search_with_branch_context(
            self.store.as_ref(),
            &vector,
            branch,
            limit,
            collection,
            &self.config,
        )
    }

    /// Hide every chunk of `branch`.
    pub fn cleanup_branch(&self, branch: &str, collection: &str) -> Result<CleanupResult, BdxError> {
        let _lease = self.lease(collection)?;
        lifecycle::cleanup_branch(self.store.as_ref(), branch, collection)
    }

    /// Delete content no branch can see.
    pub fn garbage_collect(&self, collection: &str) -> Result<GcResult, BdxError> {
        let _lease = self.lease(collection)?;
        lifecycle::garbage_collect_content(
            self.store.as_ref(),
            collection,
            self.config.scroll_page_size,
        )
    }

    pub fn stats(&self, collection: &str) -> Result<CollectionStats, BdxError> {
        lifecycle::collection_stats(self.store.as_ref(), collection, self.config.scroll_page_size)
    }

    /// Report the working-tree state of each file.
    pub fn drift(&self, files: &[String]) -> Vec<DriftReport> {
        files
            .iter()
            .map(|file_path| {
                let id: WorkingDirId = self.git.working_directory_id(file_path);
                DriftReport {
                    file_path: file_path.clone(),
                    revision: self.git.current_revision(file_path),
                    status: self.git.classify_working_dir_status(file_path),
                    differs_from_committed: !id.is_committed_form(),
                    working_dir_id: id.to_string(),
                }
            })
            .collect()
    }

    /// Lease `collection` and reload it, since another process may have
    /// written it since the store was opened.
    fn lease(&self, collection: &str) -> Result<CollectionLease, BdxError> {
        let lease = self.locks.try_acquire(collection)?;
        self.store.refresh(collection)?;
        Ok(lease)
    }

    fn indexer(&self) -> BranchIndexer<'_> {
        BranchIndexer::new(
            self.store.as_ref(),
            self.embedder.as_ref(),
            self.chunker.as_ref(),
            &self.git,
            self.git.repo_root(),
        )
        .with_config(self.config.clone())
    }
}
