//! Point store trait.
//!
//! This module defines the abstraction every storage backend implements. It
//! mirrors the operations a remote vector database exposes (point lookup,
//! batch upsert, filtered similarity search, cursor-based scroll, filtered
//! bulk payload update, delete by id) and nothing more: the store has no
//! notion of branches, visibility or content addressing.

use serde_json::Value;

use crate::error::DbResult;
use crate::filter::PointFilter;
use crate::point::{Payload, Point, PointId, ScoredPoint};

/// Payload key stamped by [`PointStore::create_point`].
pub const EMBEDDING_MODEL_FIELD: &str = "embedding_model";

// ============================================================================
// PointStore Trait
// ============================================================================

/// Core trait for point storage backends.
///
/// ## Implementation Notes
///
/// - Backends must be thread-safe (`Send + Sync`).
/// - `upsert_points` replaces any existing point with the same id and must
///   apply a whole batch or none of it.
/// - `search` returns results best first.
/// - `scroll_points` walks points in a stable order; the returned cursor is
///   the id to pass as `offset` for the next page, `None` when exhausted.
pub trait PointStore: Send + Sync {
    /// Create the collection if it does not exist yet.
    fn ensure_collection(&self, collection: &str, dimension: usize) -> DbResult<()>;

    /// Build a point ready for upsert, recording the embedding model that
    /// produced its vector.
    fn create_point(
        &self,
        id: PointId,
        vector: Vec<f32>,
        mut payload: Payload,
        embedding_model: &str,
    ) -> Point {
        payload.insert(
            EMBEDDING_MODEL_FIELD.to_string(),
            Value::from(embedding_model),
        );
        Point::new(id, vector, payload)
    }

    /// Re-read `collection` from durable storage.
    ///
    /// Backends that cache collections in memory call this after another
    /// process may have written them. The default does nothing.
    fn refresh(&self, _collection: &str) -> DbResult<()> {
        Ok(())
    }

    /// Fetch a single point by id.
    fn get_point(&self, id: &PointId, collection: &str) -> DbResult<Option<Point>>;

    /// Insert or replace a batch of points.
    fn upsert_points(&self, points: &[Point], collection: &str) -> DbResult<()>;

    /// Similarity search restricted by an optional filter.
    fn search(
        &self,
        query: &[f32],
        filter: Option<&PointFilter>,
        limit: usize,
        collection: &str,
    ) -> DbResult<Vec<ScoredPoint>>;

    /// Read one page of points matching `filter`, starting at `offset`.
    fn scroll_points(
        &self,
        filter: Option<&PointFilter>,
        collection: &str,
        limit: usize,
        offset: Option<PointId>,
    ) -> DbResult<(Vec<Point>, Option<PointId>)>;

    /// Merge `updates` into the payload of every point matching `filter`.
    ///
    /// Returns the number of points updated.
    fn batch_update_points(
        &self,
        filter: &PointFilter,
        updates: &Payload,
        collection: &str,
    ) -> DbResult<usize>;

    /// Delete points by id. Returns the number of points actually removed.
    fn delete_points(&self, ids: &[PointId], collection: &str) -> DbResult<usize>;

    /// Count points matching `filter`.
    fn count(&self, filter: Option<&PointFilter>, collection: &str) -> DbResult<usize>;

    /// Scroll through every page matching `filter`.
    ///
    /// Stops early once `cap` points have been collected.
    fn scroll_all(
        &self,
        filter: Option<&PointFilter>,
        collection: &str,
        page_size: usize,
        cap: Option<usize>,
    ) -> DbResult<Vec<Point>> {
        let page_size = page_size.max(1);
        let mut collected = Vec::new();
        let mut offset = None;

        loop {
            let limit = match cap {
                Some(cap) => page_size.min(cap.saturating_sub(collected.len())),
                None => page_size,
            };
            if limit == 0 {
                break;
            }

            let (page, next) = self.scroll_points(filter, collection, limit, offset)?;
            collected.extend(page);

            match next {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(collected)
    }
}
