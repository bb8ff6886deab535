//! Branch-filtered similarity search.
//!
//! The point store has no branch concept, so a query runs in two stages:
//! an over-fetched similarity search over content points, then a filter
//! keeping only candidates referenced by a visible visibility point of the
//! requested branch.

use std::collections::HashSet;

use tracing::debug;

use bdx_db::{PointFilter, PointId, PointStore, ScoredPoint};

use crate::config::IndexerConfig;
use crate::constants::{fields, POINT_TYPE_CONTENT, POINT_TYPE_VISIBILITY};
use crate::errors::BdxError;
use crate::payload::{ContentPayload, VisibilityPayload, VisibilityStatus};
use crate::types::ContentResult;

/// Content ids visible on `branch`, reading at most `cap` visibility points.
pub fn visible_content_ids(
    store: &dyn PointStore,
    branch: &str,
    collection: &str,
    page_size: usize,
    cap: usize,
) -> Result<HashSet<PointId>, BdxError> {
    let filter = PointFilter::new()
        .must_match(fields::TYPE, POINT_TYPE_VISIBILITY)
        .must_match(fields::BRANCH, branch)
        .must_match(fields::STATUS, VisibilityStatus::Visible.as_str());

    let points = store.scroll_all(Some(&filter), collection, page_size.min(cap), Some(cap))?;
    points
        .iter()
        .map(|p| VisibilityPayload::from_point(p).map(|v| v.content_id))
        .collect()
}

/// Search `collection` for content visible on `branch`.
///
/// Fetches `limit * search_overfetch_factor` candidates by similarity, then
/// keeps those whose id is visible on the branch, in score order, until
/// `limit` results are collected. The visible set is read up to
/// `visible_scan_cap` points; content beyond the cap is not returned.
pub fn search_with_branch_context(
    store: &dyn PointStore,
    query: &[f32],
    branch: &str,
    limit: usize,
    collection: &str,
    config: &IndexerConfig,
) -> Result<Vec<ContentResult>, BdxError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let content_filter = PointFilter::new().must_match(fields::TYPE, POINT_TYPE_CONTENT);
    let fetch = limit.saturating_mul(config.search_overfetch_factor.max(1));
    let candidates = store.search(query, Some(&content_filter), fetch, collection)?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let visible = visible_content_ids(
        store,
        branch,
        collection,
        config.scroll_page_size,
        config.visible_scan_cap,
    )?;
    debug!(
        "Search on '{}': {} candidates, {} visible content ids",
        branch,
        candidates.len(),
        visible.len()
    );

    candidates
        .into_iter()
        .filter(|c| visible.contains(&c.id))
        .take(limit)
        .map(to_content_result)
        .collect()
}

fn to_content_result(hit: ScoredPoint) -> Result<ContentResult, BdxError> {
    let payload = ContentPayload::from_payload(&hit.payload)?;
    Ok(ContentResult {
        id: hit.id,
        score: hit.score,
        file_path: payload.file_path,
        chunk_index: payload.chunk_index,
        revision: payload.git_commit,
        language: payload.language,
        content: payload.content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::indexer::test_support::{Fixture, COLLECTION};

    fn query(fx: &Fixture, text: &str) -> Vec<f32> {
        fx.embedder.embed(text).unwrap()
    }

    #[test]
    fn test_results_are_limited_to_branch() {
        let fx = Fixture::new();
        fx.commit("shared.py", "def shared_helper(): pass\n", "c1");
        fx.commit("only_main.py", "def shared_helper_main(): pass\n", "c1");
        fx.switch("main", "main", &["shared.py", "only_main.py"], &[]);
        fx.switch("main", "feature", &[], &["shared.py"]);

        let q = query(&fx, "def shared_helper");
        let feature = search_with_branch_context(&fx.store, &q, "feature", 10, COLLECTION, &fx.config)
            .unwrap();
        let main = search_with_branch_context(&fx.store, &q, "main", 10, COLLECTION, &fx.config)
            .unwrap();

        assert_eq!(feature.len(), 1);
        assert_eq!(feature[0].file_path, "shared.py");
        assert_eq!(feature[0].revision, "c1");
        assert_eq!(main.len(), 2);
        assert!(main[0].score >= main[1].score);
    }

    #[test]
    fn test_unknown_branch_and_empty_collection() {
        let fx = Fixture::new();
        fx.store.ensure_collection(COLLECTION, 64).unwrap();
        let q = query(&fx, "anything");
        assert!(
            search_with_branch_context(&fx.store, &q, "main", 5, COLLECTION, &fx.config)
                .unwrap()
                .is_empty()
        );

        fx.commit("a.py", "anything = 1\n", "c1");
        fx.switch("main", "main", &["a.py"], &[]);
        assert!(
            search_with_branch_context(&fx.store, &q, "ghost", 5, COLLECTION, &fx.config)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_limit_applies_after_branch_filter() {
        let fx = Fixture::new();
        let files: Vec<String> = (0..6).map(|i| format!("f{}.py", i)).collect();
        for file in &files {
            fx.commit(file, "token = compute_token()\n", "c1");
        }
        fx.indexer()
            .index_branch_changes("main", "main", &files, &[], COLLECTION, None)
            .unwrap();

        let q = query(&fx, "compute_token");
        let results =
            search_with_branch_context(&fx.store, &q, "main", 2, COLLECTION, &fx.config).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_visible_content_ids_respects_cap() {
        let fx = Fixture::new();
        let files: Vec<String> = (0..5).map(|i| format!("g{}.py", i)).collect();
        for file in &files {
            fx.commit(file, &format!("{} = 1\n", file.replace('.', "_")), "c1");
        }
        fx.indexer()
            .index_branch_changes("main", "main", &files, &[], COLLECTION, None)
            .unwrap();

        let all = visible_content_ids(&fx.store, "main", COLLECTION, 2, 100).unwrap();
        assert_eq!(all.len(), 5);
        let capped = visible_content_ids(&fx.store, "main", COLLECTION, 2, 3).unwrap();
        assert_eq!(capped.len(), 3);
    }
}
