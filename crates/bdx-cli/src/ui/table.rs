//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `bdx search` | `render_search_table()` |
//! | `bdx stats` | `render_stats_table()` |
//! | `bdx drift` | `render_drift_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, Table};

use bdx_core::{CollectionStats, ContentResult, DriftReport};

use super::format::{format_thousands, preview_line, truncate_str};

/// Width of the content preview column.
const PREVIEW_WIDTH: usize = 60;

fn plain_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table
}

/// Render search hits.
///
/// ```text
/// SCORE  FILE            CHUNK  REVISION  PREVIEW
/// 0.912  src/config.rs       0  1a2b3c4d  pub fn load_config(path: &Path) -> ...
/// ```
pub fn render_search_table(results: &[ContentResult]) -> String {
    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("SCORE"),
        Cell::new("FILE"),
        Cell::new("CHUNK").set_alignment(CellAlignment::Right),
        Cell::new("REVISION"),
        Cell::new("PREVIEW"),
    ]);

    for hit in results {
        table.add_row(vec![
            Cell::new(format!("{:.3}", hit.score)),
            Cell::new(&hit.file_path),
            Cell::new(hit.chunk_index).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&hit.revision, 8)),
            Cell::new(preview_line(&hit.content, PREVIEW_WIDTH)),
        ]);
    }
    table.to_string()
}

/// Render collection point counts.
pub fn render_stats_table(stats: &CollectionStats) -> String {
    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("POINTS"),
        Cell::new("COUNT").set_alignment(CellAlignment::Right),
    ]);

    let rows = [
        ("content", stats.content_points),
        ("visible", stats.visible_points),
        ("hidden", stats.hidden_points),
    ];
    for (label, count) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format_thousands(count)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

/// Render working-tree drift of files.
pub fn render_drift_table(reports: &[DriftReport]) -> String {
    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("FILE"),
        Cell::new("STATUS"),
        Cell::new("REVISION"),
        Cell::new("WORKING DIR ID"),
    ]);

    for report in reports {
        table.add_row(vec![
            Cell::new(&report.file_path),
            Cell::new(report.status.as_str()),
            Cell::new(truncate_str(&report.revision, 8)),
            Cell::new(&report.working_dir_id),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_core::{commit_scoped_id, WorkingDirStatus};

    #[test]
    fn test_search_table_contains_rows() {
        let results = vec![ContentResult {
            id: commit_scoped_id("a.py", "c1", 0),
            score: 0.5,
            file_path: "a.py".into(),
            chunk_index: 0,
            revision: "0123456789".into(),
            language: "python".into(),
            content: "\ndef a():\n    pass".into(),
        }];
        let rendered = render_search_table(&results);
        assert!(rendered.contains("SCORE"));
        assert!(rendered.contains("a.py"));
        assert!(rendered.contains("def a():"));
        assert!(rendered.contains("01234..."));
    }

    #[test]
    fn test_stats_table_formats_counts() {
        let stats = CollectionStats {
            collection: "repo".into(),
            content_points: 12345,
            visible_points: 2,
            hidden_points: 0,
            branches: vec!["main".into()],
        };
        let rendered = render_stats_table(&stats);
        assert!(rendered.contains("12,345"));
        assert!(rendered.contains("hidden"));
    }

    #[test]
    fn test_drift_table() {
        let reports = vec![DriftReport {
            file_path: "a.py".into(),
            revision: "unknown".into(),
            status: WorkingDirStatus::Untracked,
            differs_from_committed: true,
            working_dir_id: "a.py:working_dir_1_2".into(),
        }];
        let rendered = render_drift_table(&reports);
        assert!(rendered.contains("untracked"));
        assert!(rendered.contains("a.py:working_dir_1_2"));
    }
}
