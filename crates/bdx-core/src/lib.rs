//! # bdx-core
//!
//! **Branch-aware content indexer** – core library.
//!
//! Keeps a semantic index of a git repository consistent across branch
//! switches. Chunks are stored once per (file, revision, chunk) as immutable
//! content points; each branch sees them through mutable visibility points
//! keyed by (branch, file, chunk).
//!
//! ## Main Types
//!
//! - [`IndexEngine`] – façade owning the store, embedder, chunker and git CLI
//! - [`BranchIndexer`] – applies a branch switch to a collection
//! - [`GitCli`] – time-bounded drift detection
//! - [`BdxError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`addressing`] – content ids, visibility ids, working-directory ids
//! - [`git`] – git CLI wrapper and the [`RevisionSource`] seam
//! - [`indexer`] – the branch indexing engine
//! - [`search`] – branch-filtered similarity search
//! - [`lifecycle`] – branch cleanup, content GC, collection stats
//! - [`lock`] – optional per-collection leases
//! - [`config`] – [`IndexerConfig`]
//!
//! ## Example
//!
//! ```ignore
//! use bdx_core::{IndexEngine, IndexerConfig};
//! use bdx_db::{open_point_store, PointStoreConfig};
//!
//! let store = open_point_store(&PointStoreConfig::persistent(".bdx/store"))?;
//! let engine = IndexEngine::new(".", store, IndexerConfig::load_default()?);
//!
//! let plan = engine.plan_switch("main", "feature")?;
//! let result = engine.switch_branch("main", "feature", &plan.changed, &plan.unchanged, "repo", None)?;
//! println!("{} chunks reused", result.content_points_reused);
//! ```

// Modules
pub mod addressing;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod engine;
pub mod errors;
pub mod git;
pub mod indexer;
pub mod lifecycle;
pub mod lock;
pub mod payload;
pub mod search;
pub mod types;

// Re-exports for convenience
pub use addressing::{
    commit_scoped_id, content_hash, visibility_id, working_directory_id, FileDrift, WorkingDirId,
};
pub use chunker::{detect_language, LineChunker, TextChunk, TextChunker};
pub use config::IndexerConfig;
pub use engine::{DriftReport, IndexEngine, SwitchPlan};
pub use embedding::{EmbeddingProvider, HashEmbedder, ModelInfo, HASH_EMBEDDER_MODEL};
pub use errors::BdxError;
pub use git::{GitCli, RevisionSource, WorkingDirStatus};
pub use indexer::{validate_branch_name, BranchIndexer};
pub use lifecycle::{cleanup_branch, collection_stats, garbage_collect_content};
pub use lock::{CollectionLease, CollectionLocks};
pub use payload::{ContentPayload, VisibilityPayload, VisibilityStatus};
pub use search::{search_with_branch_context, visible_content_ids};
pub use types::{
    BranchIndexResult, CleanupResult, CollectionStats, ContentResult, GcResult, ProgressCallback,
    ProgressControl, ProgressEvent,
};
