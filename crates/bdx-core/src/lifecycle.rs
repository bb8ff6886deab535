//! Branch cleanup and content garbage collection.

use std::collections::{BTreeSet, HashSet};

use serde_json::Value;
use tracing::{debug, info};

use bdx_db::{Payload, PointFilter, PointId, PointStore};

use crate::constants::{fields, POINT_TYPE_CONTENT, POINT_TYPE_VISIBILITY};
use crate::errors::BdxError;
use crate::indexer::validate_branch_name;
use crate::payload::{VisibilityPayload, VisibilityStatus};
use crate::types::{CleanupResult, CollectionStats, GcResult};

/// Hide every visible chunk of `branch`.
///
/// Content points are left alone so that a later switch back to the branch,
/// or another branch at the same revisions, can reuse them.
pub fn cleanup_branch(
    store: &dyn PointStore,
    branch: &str,
    collection: &str,
) -> Result<CleanupResult, BdxError> {
    validate_branch_name(branch)?;

    let filter = PointFilter::new()
        .must_match(fields::TYPE, POINT_TYPE_VISIBILITY)
        .must_match(fields::BRANCH, branch)
        .must_match(fields::STATUS, VisibilityStatus::Visible.as_str());
    let mut updates = Payload::new();
    updates.insert(
        fields::STATUS.to_string(),
        Value::from(VisibilityStatus::Hidden.as_str()),
    );

    let hidden = store.batch_update_points(&filter, &updates, collection)?;
    info!("Hid {} visibility points of '{}' in '{}'", hidden, branch, collection);

    Ok(CleanupResult {
        visibility_points_hidden: hidden,
    })
}

/// Delete content points no branch can see any more.
///
/// The live set is built from every visible visibility point across all
/// branches; hidden references do not keep content alive.
pub fn garbage_collect_content(
    store: &dyn PointStore,
    collection: &str,
    page_size: usize,
) -> Result<GcResult, BdxError> {
    let visible_filter = PointFilter::new()
        .must_match(fields::TYPE, POINT_TYPE_VISIBILITY)
        .must_match(fields::STATUS, VisibilityStatus::Visible.as_str());
    let live: HashSet<PointId> = store
        .scroll_all(Some(&visible_filter), collection, page_size, None)?
        .iter()
        .map(|p| VisibilityPayload::from_point(p).map(|v| v.content_id))
        .collect::<Result<_, _>>()?;

    let content_filter = PointFilter::new().must_match(fields::TYPE, POINT_TYPE_CONTENT);
    let content = store.scroll_all(Some(&content_filter), collection, page_size, None)?;

    let (preserved, orphaned): (Vec<PointId>, Vec<PointId>) = content
        .iter()
        .map(|p| p.id)
        .partition(|id| live.contains(id));
    debug!(
        "GC '{}': {} live ids, {} content points, {} orphaned",
        collection,
        live.len(),
        content.len(),
        orphaned.len()
    );

    let deleted = if orphaned.is_empty() {
        0
    } else {
        store.delete_points(&orphaned, collection)?
    };
    info!(
        "GC '{}': deleted {} content points, preserved {}",
        collection,
        deleted,
        preserved.len()
    );

    Ok(GcResult {
        content_points_deleted: deleted,
        content_points_preserved: preserved.len(),
    })
}

/// Count content and visibility points of a collection.
pub fn collection_stats(
    store: &dyn PointStore,
    collection: &str,
    page_size: usize,
) -> Result<CollectionStats, BdxError> {
    let content_filter = PointFilter::new().must_match(fields::TYPE, POINT_TYPE_CONTENT);
    let visibility_filter = PointFilter::new().must_match(fields::TYPE, POINT_TYPE_VISIBILITY);

    let content_points = store.count(Some(&content_filter), collection)?;
    let visibility = store.scroll_all(Some(&visibility_filter), collection, page_size, None)?;

    let mut stats = CollectionStats {
        collection: collection.to_string(),
        content_points,
        ..CollectionStats::default()
    };
    let mut branches = BTreeSet::new();
    for point in &visibility {
        let payload = VisibilityPayload::from_point(point)?;
        match payload.status {
            VisibilityStatus::Visible => stats.visible_points += 1,
            VisibilityStatus::Hidden => stats.hidden_points += 1,
        }
        branches.insert(payload.branch);
    }
    stats.branches = branches.into_iter().collect();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::commit_scoped_id;
    use crate::indexer::test_support::{Fixture, COLLECTION};

    const PAGE: usize = 2;

    #[test]
    fn test_cleanup_hides_only_that_branch() {
        let fx = Fixture::new();
        fx.commit("a.py", "a = 1\n", "c1");
        fx.commit("b.py", "b = 1\n", "c1");
        fx.switch("main", "main", &["a.py", "b.py"], &[]);
        fx.switch("main", "feature", &[], &["a.py", "b.py"]);

        let result = cleanup_branch(&fx.store, "feature", COLLECTION).unwrap();
        assert_eq!(result.visibility_points_hidden, 2);

        let stats = collection_stats(&fx.store, COLLECTION, PAGE).unwrap();
        assert_eq!(stats.content_points, 2);
        assert_eq!(stats.visible_points, 2);
        assert_eq!(stats.hidden_points, 2);
        assert_eq!(stats.branches, vec!["feature".to_string(), "main".to_string()]);

        let again = cleanup_branch(&fx.store, "feature", COLLECTION).unwrap();
        assert_eq!(again.visibility_points_hidden, 0);
    }

    #[test]
    fn test_gc_keeps_content_visible_elsewhere() {
        let fx = Fixture::new();
        fx.commit("a.py", "a = 1\n", "c1");
        fx.switch("main", "main", &["a.py"], &[]);
        fx.switch("main", "feature", &[], &["a.py"]);

        fx.commit("a.py", "a = 2\n", "c2");
        fx.switch("feature", "feature", &["a.py"], &[]);

        cleanup_branch(&fx.store, "feature", COLLECTION).unwrap();
        let gc = garbage_collect_content(&fx.store, COLLECTION, PAGE).unwrap();

        assert_eq!(gc.content_points_deleted, 1);
        assert_eq!(gc.content_points_preserved, 1);
        assert!(fx
            .store
            .get_point(&commit_scoped_id("a.py", "c1", 0), COLLECTION)
            .unwrap()
            .is_some());
        assert!(fx
            .store
            .get_point(&commit_scoped_id("a.py", "c2", 0), COLLECTION)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_gc_without_orphans_deletes_nothing() {
        let fx = Fixture::new();
        fx.commit("a.py", "a = 1\n", "c1");
        fx.switch("main", "main", &["a.py"], &[]);

        let gc = garbage_collect_content(&fx.store, COLLECTION, PAGE).unwrap();
        assert_eq!(
            gc,
            GcResult {
                content_points_deleted: 0,
                content_points_preserved: 1,
            }
        );
    }

    #[test]
    fn test_gc_paginates_visibility_across_pages() {
        let fx = Fixture::new();
        let files: Vec<String> = (0..7).map(|i| format!("p{}.py", i)).collect();
        for file in &files {
            fx.commit(file, &format!("{} = 0\n", file.replace('.', "_")), "c1");
        }
        fx.indexer()
            .index_branch_changes("main", "main", &files, &[], COLLECTION, None)
            .unwrap();

        let gc = garbage_collect_content(&fx.store, COLLECTION, PAGE).unwrap();
        assert_eq!(gc.content_points_deleted, 0);
        assert_eq!(gc.content_points_preserved, 7);
    }

    #[test]
    fn test_cleanup_missing_collection_is_an_error() {
        let fx = Fixture::new();
        assert!(matches!(
            cleanup_branch(&fx.store, "main", "nope"),
            Err(BdxError::Store(_))
        ));
    }
}
