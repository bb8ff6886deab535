//! End-to-end branch workflow through the `bdx` binary.
//!
//! Each test builds a throwaway git repository and is skipped when git is
//! not installed.

mod common;

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use common::{bdx_cmd, git, git_installed, init_repo};

const SETTINGS_PY: &str = "def load_settings(path):\n    return open(path).read()\n";
const UTIL_PY: &str = "def clamp(x, lo, hi):\n    return max(lo, min(x, hi))\n";

fn repo_with_main() -> Option<TempDir> {
    if !git_installed() {
        eprintln!("git not installed, skipping");
        return None;
    }
    let temp = TempDir::new().expect("create temp dir");
    init_repo(
        temp.path(),
        &[("settings.py", SETTINGS_PY), ("util.py", UTIL_PY)],
    );
    Some(temp)
}

fn json_of(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = bdx_cmd(dir)
        .arg("--repo")
        .arg(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("run bdx");
    assert!(
        output.status.success(),
        "bdx {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON output")
}

#[test]
fn test_index_then_search_on_checked_out_branch() {
    let Some(temp) = repo_with_main() else { return };
    let repo = temp.path();

    let indexed = json_of(repo, &["index"]);
    assert_eq!(indexed["filesProcessed"], 2);
    assert_eq!(indexed["contentPointsCreated"], 2);
    assert_eq!(indexed["interrupted"], false);
    assert!(repo.join(".bdx/store").exists());

    let hits = json_of(repo, &["search", "load_settings path", "--limit", "5"]);
    let hits = hits.as_array().expect("array of hits");
    assert!(!hits.is_empty());
    assert!(hits.iter().any(|h| h["filePath"] == "settings.py"));

    let other = json_of(repo, &["search", "load_settings", "--branch", "nowhere"]);
    assert_eq!(other.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_switch_reuses_unchanged_content() {
    let Some(temp) = repo_with_main() else { return };
    let repo = temp.path();

    json_of(repo, &["index"]);

    git(repo, &["checkout", "-q", "-b", "feature"]);
    fs::write(
        repo.join("settings.py"),
        "def load_settings(path, strict=False):\n    return open(path).read()\n",
    )
    .expect("write file");
    git(repo, &["commit", "-q", "-am", "strict settings"]);

    let switched = json_of(repo, &["switch", "--from", "main"]);
    assert_eq!(switched["filesProcessed"], 2);
    assert_eq!(switched["contentPointsCreated"], 1);
    assert_eq!(switched["contentPointsReused"], 1);

    let stats = json_of(repo, &["stats"]);
    assert_eq!(stats["contentPoints"], 3);
    assert_eq!(stats["branches"], serde_json::json!(["feature", "main"]));
}

#[test]
fn test_cleanup_then_gc_deletes_only_orphans() {
    let Some(temp) = repo_with_main() else { return };
    let repo = temp.path();

    json_of(repo, &["index"]);
    git(repo, &["checkout", "-q", "-b", "feature"]);
    fs::write(repo.join("util.py"), "def clamp(x):\n    return x\n").expect("write file");
    git(repo, &["commit", "-q", "-am", "simplify clamp"]);
    json_of(repo, &["switch", "--from", "main"]);

    let cleaned = json_of(repo, &["cleanup", "feature"]);
    assert_eq!(cleaned["visibilityPointsHidden"], 2);

    let gc = json_of(repo, &["gc"]);
    assert_eq!(gc["contentPointsDeleted"], 1);
    assert_eq!(gc["contentPointsPreserved"], 2);

    let hits = json_of(repo, &["search", "clamp", "--branch", "main"]);
    assert!(hits
        .as_array()
        .expect("array of hits")
        .iter()
        .any(|h| h["filePath"] == "util.py"));
}

#[test]
fn test_drift_reports_modified_file() {
    let Some(temp) = repo_with_main() else { return };
    let repo = temp.path();

    fs::write(repo.join("util.py"), "def clamp():\n    pass\n").expect("write file");

    bdx_cmd(repo)
        .arg("--repo")
        .arg(repo)
        .arg("drift")
        .assert()
        .success()
        .stdout(predicate::str::contains("unstaged"))
        .stdout(predicate::str::contains("1 of 2 files differ from HEAD"));
}

#[test]
fn test_fail_fast_and_max_files_interrupt() {
    let Some(temp) = repo_with_main() else { return };
    let repo = temp.path();

    let limited = json_of(repo, &["index", "--max-files", "1"]);
    assert_eq!(limited["interrupted"], true);
    assert_eq!(limited["filesProcessed"], 1);
}
