//! Branch indexing engine.
//!
//! Applies a branch switch to the point store. For every changed file the
//! engine either hides the file (deleted on disk), re-points visibility at
//! content already indexed for the file's revision, or chunks and embeds the
//! file into new content points. Unchanged files only get their visible
//! visibility points copied from the old branch to the new one.
//!
//! Writes are accumulated and flushed in batches. Per-file failures are
//! logged and reported through the progress callback; batch write failures
//! abort the switch.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use bdx_db::{Payload, Point, PointFilter, PointId, PointStore};

use crate::addressing::{commit_scoped_id, content_hash, visibility_id};
use crate::chunker::{detect_language, TextChunker};
use crate::config::IndexerConfig;
use crate::constants::{fields, POINT_TYPE_VISIBILITY, UNKNOWN_REVISION, WORKING_DIR_MARKER};
use crate::embedding::EmbeddingProvider;
use crate::errors::BdxError;
use crate::git::{file_metadata, RevisionSource};
use crate::payload::{ContentPayload, VisibilityPayload, VisibilityStatus};
use crate::types::{BranchIndexResult, ProgressCallback, ProgressControl, ProgressEvent};

/// Reject empty branch names and names containing whitespace.
pub fn validate_branch_name(branch: &str) -> Result<(), BdxError> {
    if branch.is_empty() || branch.chars().any(char::is_whitespace) {
        return Err(BdxError::InvalidBranchName(branch.to_string()));
    }
    Ok(())
}

/// Filter selecting the visibility points of one file on one branch.
pub(crate) fn file_visibility_filter(branch: &str, file_path: &str) -> PointFilter {
    PointFilter::new()
        .must_match(fields::TYPE, POINT_TYPE_VISIBILITY)
        .must_match(fields::BRANCH, branch)
        .must_match(fields::PATH, file_path)
}

// ============================================================================
// Batching
// ============================================================================

/// Points waiting to be upserted.
struct PendingBatch<'s> {
    store: &'s dyn PointStore,
    collection: &'s str,
    points: Vec<Point>,
    limit: usize,
}

impl<'s> PendingBatch<'s> {
    fn new(store: &'s dyn PointStore, collection: &'s str, limit: usize) -> Self {
        Self {
            store,
            collection,
            points: Vec::new(),
            limit: limit.max(1),
        }
    }

    fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
    }

    /// Queue points, flushing every time the batch fills up.
    fn extend(&mut self, points: Vec<Point>) -> Result<(), BdxError> {
        for point in points {
            self.points.push(point);
            if self.points.len() >= self.limit {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BdxError> {
        if self.points.is_empty() {
            return Ok(());
        }
        debug!(
            "Flushing {} points to '{}'",
            self.points.len(),
            self.collection
        );
        self.store.upsert_points(&self.points, self.collection)?;
        self.points.clear();
        Ok(())
    }
}

// ============================================================================
// Per-file Work
// ============================================================================

/// Outcome of one file, applied to the result only if the file succeeded.
#[derive(Default)]
struct FileWork {
    points: Vec<Point>,
    content_created: usize,
    visibility_created: usize,
    visibility_updated: usize,
    reused: usize,
    hidden: usize,
    info: Option<String>,
}

impl FileWork {
    fn with_info(info: impl Into<String>) -> Self {
        Self {
            info: Some(info.into()),
            ..Self::default()
        }
    }

    fn record_visibility(&mut self, point: Point, existed: bool) {
        if existed {
            self.visibility_updated += 1;
        } else {
            self.visibility_created += 1;
        }
        self.points.push(point);
    }

    fn apply(self, result: &mut BranchIndexResult) -> Vec<Point> {
        result.content_points_created += self.content_created;
        result.visibility_points_created += self.visibility_created;
        result.visibility_points_updated += self.visibility_updated;
        result.content_points_reused += self.reused;
        result.visibility_points_hidden += self.hidden;
        result.files_processed += 1;
        self.points
    }
}

/// Revision recorded on content points and the revision their ids are
/// derived from.
///
/// The two differ only when the revision is unknown: the file's bytes then
/// stand in for the commit, so every edit gets fresh content ids instead of
/// reusing the first snapshot indexed under `unknown`.
struct ContentKey {
    revision: String,
    id_revision: String,
}

impl ContentKey {
    fn resolve(revision: String, absolute: &Path) -> Result<Self, BdxError> {
        if revision != UNKNOWN_REVISION {
            return Ok(Self {
                id_revision: revision.clone(),
                revision,
            });
        }
        let bytes = fs::read(absolute)?;
        let digest = content_hash(&String::from_utf8_lossy(&bytes));
        Ok(Self {
            id_revision: format!("{}_{}", WORKING_DIR_MARKER, &digest[..16]),
            revision,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Changed,
    Unchanged,
}

// ============================================================================
// BranchIndexer
// ============================================================================

/// Applies branch switches to a collection.
///
/// All collaborators are borrowed; the indexer holds no state between calls
/// and takes no locks.
pub struct BranchIndexer<'a> {
    store: &'a dyn PointStore,
    embedder: &'a dyn EmbeddingProvider,
    chunker: &'a dyn TextChunker,
    revisions: &'a dyn RevisionSource,
    repo_root: PathBuf,
    config: IndexerConfig,
}

impl<'a> BranchIndexer<'a> {
    /// Create an indexer for the repository at `repo_root`.
    pub fn new(
        store: &'a dyn PointStore,
        embedder: &'a dyn EmbeddingProvider,
        chunker: &'a dyn TextChunker,
        revisions: &'a dyn RevisionSource,
        repo_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            embedder,
            chunker,
            revisions,
            repo_root: repo_root.into(),
            config: IndexerConfig::default(),
        }
    }

    /// Use custom batch sizes and limits.
    pub fn with_config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    /// Repository root file paths are resolved against.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Index the file changes of a switch from `old_branch` to `new_branch`.
    ///
    /// `changed_files` are (re)indexed or hidden when missing on disk;
    /// `unchanged_files` inherit the visible chunks of `old_branch`. Paths are
    /// relative to the repository root and handled in the given order.
    ///
    /// The optional `progress` callback runs after every file and may return
    /// [`ProgressControl::Interrupt`] to stop early. An interrupted switch
    /// still flushes its pending writes and returns `Ok` with partial counts.
    ///
    /// # Errors
    ///
    /// Invalid branch names and point-store write failures. Failures of a
    /// single file are counted in `files_failed` instead.
    pub fn index_branch_changes(
        &self,
        old_branch: &str,
        new_branch: &str,
        changed_files: &[String],
        unchanged_files: &[String],
        collection: &str,
        mut progress: Option<ProgressCallback<'_>>,
    ) -> Result<BranchIndexResult, BdxError> {
        validate_branch_name(old_branch)?;
        validate_branch_name(new_branch)?;

        let started = Instant::now();
        let dimension = self.embedder.model_info().dimensions;
        self.store.ensure_collection(collection, dimension)?;

        info!(
            "Switching '{}' -> '{}' in '{}': {} changed, {} unchanged",
            old_branch,
            new_branch,
            collection,
            changed_files.len(),
            unchanged_files.len()
        );

        let git_available = self.revisions.is_available();
        let work_items = changed_files
            .iter()
            .map(|f| (f, Phase::Changed))
            .chain(unchanged_files.iter().map(|f| (f, Phase::Unchanged)));
        let total = changed_files.len() + unchanged_files.len();

        let mut result = BranchIndexResult::default();
        let mut batch = PendingBatch::new(self.store, collection, self.config.content_batch_size);
        let mut phase = Phase::Changed;

        for (position, (file_path, file_phase)) in work_items.enumerate() {
            if file_phase != phase {
                batch.flush()?;
                batch.set_limit(self.config.visibility_batch_size);
                phase = file_phase;
            }

            let outcome = match file_phase {
                Phase::Changed => self.process_changed_file(
                    file_path,
                    new_branch,
                    collection,
                    dimension,
                    git_available,
                ),
                Phase::Unchanged => self.process_unchanged_file(
                    file_path,
                    old_branch,
                    new_branch,
                    collection,
                    dimension,
                ),
            };

            let mut event = ProgressEvent {
                current: position + 1,
                total,
                file_path: file_path.clone(),
                info: None,
                error: None,
            };

            match outcome {
                Ok(mut work) => {
                    event.info = work.info.take();
                    let points = work.apply(&mut result);
                    batch.extend(points)?;
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", file_path, e);
                    result.files_failed += 1;
                    event.error = Some(e.to_string());
                }
            }

            if let Some(callback) = progress.as_deref_mut() {
                if callback(&event) == ProgressControl::Interrupt {
                    info!(
                        "Branch switch interrupted after {}/{} files",
                        event.current, total
                    );
                    result.interrupted = true;
                    break;
                }
            }
        }

        batch.flush()?;
        result.processing_time = started.elapsed().as_secs_f64();

        info!(
            "Switch to '{}' done: {} files ({} failed), {} content created, {} reused, \
             {} visibility created, {} updated, {} hidden in {:.2}s",
            new_branch,
            result.files_processed,
            result.files_failed,
            result.content_points_created,
            result.content_points_reused,
            result.visibility_points_created,
            result.visibility_points_updated,
            result.visibility_points_hidden,
            result.processing_time
        );

        Ok(result)
    }

    fn process_changed_file(
        &self,
        file_path: &str,
        branch: &str,
        collection: &str,
        dimension: usize,
        git_available: bool,
    ) -> Result<FileWork, BdxError> {
        let absolute = self.repo_root.join(file_path);
        if !absolute.exists() {
            return self.hide_deleted_file(file_path, branch, collection);
        }

        let revision = self.revisions.current_revision(file_path);
        let key = ContentKey::resolve(revision, &absolute)?;
        let first_chunk_id = commit_scoped_id(file_path, &key.id_revision, 0);

        match self.store.get_point(&first_chunk_id, collection)? {
            Some(existing) => {
                self.reuse_content(file_path, &key, &existing, branch, collection, dimension)
            }
            None => self.index_new_content(
                file_path,
                &absolute,
                &key,
                branch,
                collection,
                dimension,
                git_available,
            ),
        }
    }

    fn hide_deleted_file(
        &self,
        file_path: &str,
        branch: &str,
        collection: &str,
    ) -> Result<FileWork, BdxError> {
        let filter = file_visibility_filter(branch, file_path)
            .must_match(fields::STATUS, VisibilityStatus::Visible.as_str());
        let mut updates = Payload::new();
        updates.insert(
            fields::STATUS.to_string(),
            Value::from(VisibilityStatus::Hidden.as_str()),
        );

        let hidden = self.store.batch_update_points(&filter, &updates, collection)?;
        debug!("{} deleted: hid {} visibility points on '{}'", file_path, hidden, branch);

        let mut work = FileWork::with_info(format!(
            "file deleted, hid {} chunks on '{}'",
            hidden, branch
        ));
        work.hidden = hidden;
        Ok(work)
    }

    /// Point `branch` at the chunks already stored for `revision`.
    ///
    /// The chunk count comes from the stored chunk-0 point, so every chunk of
    /// a (file, revision) pair is assumed to have been written together.
    fn reuse_content(
        &self,
        file_path: &str,
        key: &ContentKey,
        first_chunk: &Point,
        branch: &str,
        collection: &str,
        dimension: usize,
    ) -> Result<FileWork, BdxError> {
        let total_chunks = first_chunk
            .u64_field(fields::TOTAL_CHUNKS)
            .ok_or_else(|| BdxError::MalformedPoint {
                id: first_chunk.id.to_string(),
                field: fields::TOTAL_CHUNKS.to_string(),
            })? as usize;

        let mut work = FileWork::default();
        for chunk_index in 0..total_chunks {
            let content_id = commit_scoped_id(file_path, &key.id_revision, chunk_index);
            let (point, existed) = self.visibility_point(
                branch,
                file_path,
                chunk_index,
                content_id,
                collection,
                dimension,
            )?;
            work.record_visibility(point, existed);
            work.reused += 1;
        }
        self.hide_stale_chunks(&mut work, branch, file_path, collection, |i| i < total_chunks)?;

        debug!(
            "{}@{}: reusing {} existing chunks",
            file_path, key.id_revision, total_chunks
        );
        Ok(work)
    }

    #[allow(clippy::too_many_arguments)]
    fn index_new_content(
        &self,
        file_path: &str,
        absolute: &Path,
        key: &ContentKey,
        branch: &str,
        collection: &str,
        dimension: usize,
        git_available: bool,
    ) -> Result<FileWork, BdxError> {
        let chunks = self.chunker.chunk_file(absolute)?;
        if chunks.is_empty() {
            debug!("{}: no chunks produced", file_path);
            let mut work = FileWork::with_info("no indexable content");
            self.hide_stale_chunks(&mut work, branch, file_path, collection, |_| false)?;
            return Ok(work);
        }
        let total_chunks = chunks.len();
        let revision = key.revision.as_str();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        let model = self.embedder.current_model().to_string();
        if vectors.len() != chunks.len() {
            return Err(BdxError::Embedding {
                model,
                reason: format!("expected {} vectors, got {}", chunks.len(), vectors.len()),
            });
        }

        let (file_mtime, file_size) = file_metadata(absolute)?;
        let status = self.revisions.classify_working_dir_status(file_path);
        let language = detect_language(file_path).to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let mut work = FileWork::default();
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(BdxError::Embedding {
                    model,
                    reason: format!(
                        "vector has {} dimensions, collection expects {}",
                        vector.len(),
                        dimension
                    ),
                });
            }

            let content_id = commit_scoped_id(file_path, &key.id_revision, chunk.chunk_index);
            let payload = ContentPayload {
                point_type: ContentPayload::point_type(),
                path: file_path.to_string(),
                chunk_index: chunk.chunk_index,
                total_chunks: chunk.total_chunks,
                git_commit: revision.to_string(),
                git_commit_hash: revision.to_string(),
                content_hash: content_hash(&chunk.text),
                file_size,
                language: language.clone(),
                created_at: now.clone(),
                working_directory_status: status,
                file_mtime,
                git_available,
                file_path: file_path.to_string(),
                content: chunk.text,
                indexed_at: now.clone(),
            }
            .to_payload()?;

            let point = self.store.create_point(content_id, vector, payload, &model);
            work.points.push(point);
            work.content_created += 1;

            let (point, existed) = self.visibility_point(
                branch,
                file_path,
                chunk.chunk_index,
                content_id,
                collection,
                dimension,
            )?;
            work.record_visibility(point, existed);
        }
        self.hide_stale_chunks(&mut work, branch, file_path, collection, |i| i < total_chunks)?;

        debug!(
            "{}@{}: indexed {} new chunks",
            file_path, key.id_revision, work.content_created
        );
        Ok(work)
    }

    fn process_unchanged_file(
        &self,
        file_path: &str,
        old_branch: &str,
        new_branch: &str,
        collection: &str,
        dimension: usize,
    ) -> Result<FileWork, BdxError> {
        let filter = file_visibility_filter(old_branch, file_path)
            .must_match(fields::STATUS, VisibilityStatus::Visible.as_str());
        let visible =
            self.store
                .scroll_all(Some(&filter), collection, self.config.scroll_page_size, None)?;

        if visible.is_empty() {
            debug!("{}: nothing visible on '{}' to copy", file_path, old_branch);
            return Ok(FileWork::with_info(format!(
                "no visible chunks on '{}'",
                old_branch
            )));
        }

        let mut work = FileWork::default();
        let mut copied = HashSet::new();
        for point in &visible {
            let source = VisibilityPayload::from_point(point)?;
            let (copy, existed) = self.visibility_point(
                new_branch,
                file_path,
                source.chunk_index,
                source.content_id,
                collection,
                dimension,
            )?;
            copied.insert(source.chunk_index);
            work.record_visibility(copy, existed);
            work.reused += 1;
        }
        if new_branch != old_branch {
            self.hide_stale_chunks(&mut work, new_branch, file_path, collection, |i| {
                copied.contains(&i)
            })?;
        }
        Ok(work)
    }

    /// Queue hidden copies of the visible chunks of `file_path` on `branch`
    /// whose index `keep` rejects, so a file that shrank stops exposing
    /// chunks of an older revision.
    fn hide_stale_chunks(
        &self,
        work: &mut FileWork,
        branch: &str,
        file_path: &str,
        collection: &str,
        keep: impl Fn(usize) -> bool,
    ) -> Result<(), BdxError> {
        let filter = file_visibility_filter(branch, file_path)
            .must_match(fields::STATUS, VisibilityStatus::Visible.as_str());
        let visible =
            self.store
                .scroll_all(Some(&filter), collection, self.config.scroll_page_size, None)?;

        for mut point in visible {
            let chunk_index = point.u64_field(fields::CHUNK_INDEX).ok_or_else(|| {
                BdxError::MalformedPoint {
                    id: point.id.to_string(),
                    field: fields::CHUNK_INDEX.to_string(),
                }
            })? as usize;
            if keep(chunk_index) {
                continue;
            }
            point.payload.insert(
                fields::STATUS.to_string(),
                Value::from(VisibilityStatus::Hidden.as_str()),
            );
            work.points.push(point);
            work.hidden += 1;
        }

        if work.hidden > 0 {
            debug!(
                "{}: hid {} stale chunks on '{}'",
                file_path, work.hidden, branch
            );
        }
        Ok(())
    }

    /// Build the visibility point of `branch`/`file_path`/`chunk_index`.
    ///
    /// Returns whether a point with that id already existed. An existing
    /// point keeps its `created_at`.
    fn visibility_point(
        &self,
        branch: &str,
        file_path: &str,
        chunk_index: usize,
        content_id: PointId,
        collection: &str,
        dimension: usize,
    ) -> Result<(Point, bool), BdxError> {
        let id = visibility_id(branch, file_path, chunk_index);
        let existing = self.store.get_point(&id, collection)?;

        let mut payload = VisibilityPayload::visible(
            branch,
            file_path,
            chunk_index,
            content_id,
            self.config.visibility_priority,
        );
        if let Some(created_at) = existing
            .as_ref()
            .and_then(|p| p.str_field(fields::CREATED_AT))
        {
            payload.created_at = created_at.to_string();
        }

        let point = self.store.create_point(
            id,
            vec![0.0; dimension],
            payload.to_payload()?,
            self.embedder.current_model(),
        );
        Ok((point, existing.is_some()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use bdx_db::{SimplePointStore, VectorMetric};

    use super::BranchIndexer;
    use crate::chunker::{LineChunker, TextChunk, TextChunker};
    use crate::config::IndexerConfig;
    use crate::constants::UNKNOWN_REVISION;
    use crate::embedding::HashEmbedder;
    use crate::errors::BdxError;
    use crate::git::{RevisionSource, WorkingDirStatus};
    use crate::types::BranchIndexResult;

    pub const COLLECTION: &str = "repo";

    /// Revision source answering from a fixed table.
    #[derive(Default)]
    pub struct StaticRevisions {
        revisions: Mutex<HashMap<String, String>>,
    }

    impl StaticRevisions {
        pub fn set(&self, file_path: &str, revision: &str) {
            self.revisions
                .lock()
                .unwrap()
                .insert(file_path.to_string(), revision.to_string());
        }
    }

    impl RevisionSource for StaticRevisions {
        fn current_revision(&self, file_path: &str) -> String {
            self.revisions
                .lock()
                .unwrap()
                .get(file_path)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_REVISION.to_string())
        }

        fn classify_working_dir_status(&self, _file_path: &str) -> WorkingDirStatus {
            WorkingDirStatus::Committed
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    /// Chunker that fails for any path containing `fail_marker`.
    pub struct FailingChunker {
        pub inner: LineChunker,
        pub fail_marker: &'static str,
    }

    impl TextChunker for FailingChunker {
        fn chunk_file(&self, path: &Path) -> Result<Vec<TextChunk>, BdxError> {
            if path.to_string_lossy().contains(self.fail_marker) {
                return Err(BdxError::Chunking {
                    path: path.display().to_string(),
                    reason: "simulated failure".to_string(),
                });
            }
            self.inner.chunk_file(path)
        }
    }

    /// Scratch repository plus in-memory collaborators.
    pub struct Fixture {
        pub dir: TempDir,
        pub store: SimplePointStore,
        pub embedder: HashEmbedder,
        pub chunker: Box<dyn TextChunker>,
        pub revisions: StaticRevisions,
        pub config: IndexerConfig,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_config(IndexerConfig {
                embedding_dimension: 64,
                ..IndexerConfig::default()
            })
        }

        pub fn with_config(config: IndexerConfig) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                store: SimplePointStore::in_memory(VectorMetric::Cosine),
                embedder: HashEmbedder::new(config.embedding_dimension),
                chunker: Box::new(LineChunker::new(
                    config.chunk_max_lines,
                    config.chunk_max_file_bytes,
                )),
                revisions: StaticRevisions::default(),
                config,
            }
        }

        /// Write `content` to `file_path` committed at `revision`.
        pub fn commit(&self, file_path: &str, content: &str, revision: &str) {
            let path = self.dir.path().join(file_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
            self.revisions.set(file_path, revision);
        }

        pub fn remove(&self, file_path: &str) {
            std::fs::remove_file(self.dir.path().join(file_path)).unwrap();
        }

        pub fn indexer(&self) -> BranchIndexer<'_> {
            BranchIndexer::new(
                &self.store,
                &self.embedder,
                self.chunker.as_ref(),
                &self.revisions,
                self.dir.path(),
            )
            .with_config(self.config.clone())
        }

        pub fn switch(
            &self,
            old_branch: &str,
            new_branch: &str,
            changed: &[&str],
            unchanged: &[&str],
        ) -> BranchIndexResult {
            self.indexer()
                .index_branch_changes(
                    old_branch,
                    new_branch,
                    &to_strings(changed),
                    &to_strings(unchanged),
                    COLLECTION,
                    None,
                )
                .unwrap()
        }
    }

    pub fn to_strings(files: &[&str]) -> Vec<String> {
        files.iter().map(|f| f.to_string()).collect()
    }
}
