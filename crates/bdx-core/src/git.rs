//! Working-directory drift detection via the git CLI.
//!
//! Every call shells out to `git -C <repo_root> ...` with a per-call timeout.
//! Nothing here ever returns an error: a non-zero exit, a timeout or a
//! missing `git` binary degrades to a documented safe default
//! (`"unknown"` revision, `false` for diff checks, [`WorkingDirStatus::Unknown`]
//! for classification).

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::addressing::{working_directory_id, FileDrift, WorkingDirId};
use crate::constants::{DEFAULT_GIT_TIMEOUT_MS, UNKNOWN_REVISION};

/// How often a running git child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

// ============================================================================
// WorkingDirStatus
// ============================================================================

/// Git status of a single file relative to HEAD and the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingDirStatus {
    /// Matches HEAD, nothing staged or modified.
    Committed,
    /// Has changes staged in the index.
    Staged,
    /// Has unstaged modifications in the working tree.
    Unstaged,
    /// Not tracked by git.
    Untracked,
    /// Status could not be determined.
    Unknown,
}

impl WorkingDirStatus {
    /// Get the status as a payload string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Staged => "staged",
            Self::Unstaged => "unstaged",
            Self::Untracked => "untracked",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WorkingDirStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// RevisionSource Trait
// ============================================================================

/// Source of per-file revision information consumed by the indexer.
///
/// [`GitCli`] is the production implementation. Implementations must not
/// fail: they return [`UNKNOWN_REVISION`] / [`WorkingDirStatus::Unknown`]
/// when the answer is unavailable.
pub trait RevisionSource: Send + Sync {
    /// Most recent commit hash touching `file_path`, or `"unknown"`.
    fn current_revision(&self, file_path: &str) -> String;

    /// Classify the working-tree status of `file_path`.
    fn classify_working_dir_status(&self, file_path: &str) -> WorkingDirStatus;

    /// Whether the version-control CLI is usable for this repository.
    fn is_available(&self) -> bool;
}

// ============================================================================
// GitCli
// ============================================================================

/// Raw result of a git invocation that ran to completion.
struct GitOutput {
    code: Option<i32>,
    stdout: String,
}

impl GitOutput {
    fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Reasons a git invocation produced no usable output.
#[derive(Debug)]
enum GitFailure {
    Spawn(io::Error),
    Wait(io::Error),
    Timeout(Duration),
}

impl fmt::Display for GitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to spawn git: {}", e),
            Self::Wait(e) => write!(f, "failed to wait for git: {}", e),
            Self::Timeout(t) => write!(f, "git timed out after {:?}", t),
        }
    }
}

/// Time-bounded, failure-tolerant wrapper around the git CLI.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    timeout: Duration,
    program: OsString,
}

impl GitCli {
    /// Create a wrapper for the repository at `repo_root` with the default timeout.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            timeout: Duration::from_millis(DEFAULT_GIT_TIMEOUT_MS),
            program: OsString::from("git"),
        }
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[cfg(test)]
    fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Repository root all paths are relative to.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Run git with `args`, bounded by the configured timeout.
    fn exec(&self, args: &[&str]) -> Result<GitOutput, GitFailure> {
        let mut child = Command::new(&self.program)
            .arg("-C")
            .arg(&self.repo_root)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(GitFailure::Spawn)?;

        // Drain stdout on a separate thread so a full pipe cannot stall the child.
        let mut stdout = child.stdout.take();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(out) = stdout.as_mut() {
                let _ = out.read_to_end(&mut buf);
            }
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GitFailure::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(GitFailure::Wait(e));
                }
            }
        };

        let stdout = reader.join().unwrap_or_default();
        Ok(GitOutput {
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
        })
    }

    /// Run git and return its output only if it exited successfully.
    fn exec_ok(&self, args: &[&str]) -> Option<GitOutput> {
        match self.exec(args) {
            Ok(out) if out.success() => Some(out),
            Ok(out) => {
                debug!("git {:?} exited with {:?}", args, out.code);
                None
            }
            Err(e) => {
                warn!("git {:?} unavailable: {}", args, e);
                None
            }
        }
    }

    /// Whether the working copy of `file_path` differs from its committed blob.
    ///
    /// Files git does not track have no committed baseline and count as
    /// differing. Any CLI failure reports `false`.
    pub fn differs_from_committed(&self, file_path: &str) -> bool {
        match self.exec(&["ls-files", "--error-unmatch", "--", file_path]) {
            Ok(out) if !out.success() => return true,
            Ok(_) => {}
            Err(e) => {
                warn!("Drift check for {} degraded: {}", file_path, e);
                return false;
            }
        }

        match self.exec(&["diff", "--quiet", "HEAD", "--", file_path]) {
            Ok(out) => out.code == Some(1),
            Err(e) => {
                warn!("Drift check for {} degraded: {}", file_path, e);
                false
            }
        }
    }

    /// Working-directory id of `file_path` in its current state.
    pub fn working_directory_id(&self, file_path: &str) -> WorkingDirId {
        let revision = RevisionSource::current_revision(self, file_path);
        let drift = if self.differs_from_committed(file_path) {
            let (mtime, byte_size) =
                file_metadata(&self.repo_root.join(file_path)).unwrap_or((0, 0));
            FileDrift::Diverged { mtime, byte_size }
        } else {
            FileDrift::Committed
        };
        working_directory_id(file_path, &revision, drift)
    }

    /// Name of the checked-out branch, `None` if git cannot tell.
    pub fn current_branch(&self) -> Option<String> {
        let out = self.exec_ok(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = out.stdout.trim();
        (!branch.is_empty()).then(|| branch.to_string())
    }

    /// Files whose content differs between two revisions.
    pub fn changed_files_between(&self, old: &str, new: &str) -> Option<Vec<String>> {
        self.exec_ok(&["diff", "--name-only", old, new, "--"])
            .map(|out| out.lines())
    }

    /// Every file tracked in the index.
    pub fn tracked_files(&self) -> Option<Vec<String>> {
        self.exec_ok(&["ls-files"]).map(|out| out.lines())
    }

    /// Run a path-scoped listing command; `None` means the CLI failed.
    fn lists_path(&self, args: &[&str]) -> Option<bool> {
        self.exec_ok(args).map(|out| !out.stdout.trim().is_empty())
    }
}

impl RevisionSource for GitCli {
    fn current_revision(&self, file_path: &str) -> String {
        self.exec_ok(&["log", "-1", "--format=%H", "--", file_path])
            .map(|out| out.stdout.trim().to_string())
            .filter(|hash| !hash.is_empty())
            .unwrap_or_else(|| UNKNOWN_REVISION.to_string())
    }

    fn classify_working_dir_status(&self, file_path: &str) -> WorkingDirStatus {
        let checks: [(&[&str], WorkingDirStatus); 3] = [
            (
                &["diff", "--cached", "--name-only", "--", file_path],
                WorkingDirStatus::Staged,
            ),
            (
                &["diff", "--name-only", "--", file_path],
                WorkingDirStatus::Unstaged,
            ),
            (
                &["ls-files", "--others", "--exclude-standard", "--", file_path],
                WorkingDirStatus::Untracked,
            ),
        ];

        for (args, status) in checks {
            match self.lists_path(args) {
                Some(true) => return status,
                Some(false) => {}
                None => return WorkingDirStatus::Unknown,
            }
        }
        WorkingDirStatus::Committed
    }

    fn is_available(&self) -> bool {
        self.exec_ok(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.stdout.trim() == "true")
            .unwrap_or(false)
    }
}

/// Modification time (unix seconds) and size of a file.
pub fn file_metadata(path: &Path) -> io::Result<(u64, u64)> {
    let metadata = std::fs::metadata(path)?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok((mtime, metadata.len()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::process::Command;

    /// Whether a working `git` binary is on PATH.
    pub fn git_installed() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Run git in `dir`, panicking on failure.
    pub fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .output()
            .expect("run git");
        assert!(status.status.success(), "git {:?} failed", args);
    }

    /// Initialise a repository with one committed file.
    pub fn init_repo(dir: &Path, file: &str, content: &str) {
        git(dir, &["init", "-q"]);
        git(dir, &["config", "user.email", "test@example.com"]);
        git(dir, &["config", "user.name", "Test"]);
        git(dir, &["config", "commit.gpgsign", "false"]);
        std::fs::write(dir.join(file), content).expect("write file");
        git(dir, &["add", file]);
        git(dir, &["commit", "-q", "-m", "initial"]);
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{git, git_installed, init_repo};
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_working_dir_status_strings() {
        assert_eq!(WorkingDirStatus::Committed.as_str(), "committed");
        assert_eq!(WorkingDirStatus::Untracked.to_string(), "untracked");
        assert_eq!(
            serde_json::to_string(&WorkingDirStatus::Unstaged).unwrap(),
            "\"unstaged\""
        );
    }

    #[test]
    fn test_missing_binary_degrades_to_defaults() {
        let temp = TempDir::new().unwrap();
        let cli = GitCli::new(temp.path()).with_program("bdx-no-such-git-binary");

        assert_eq!(cli.current_revision("a.py"), UNKNOWN_REVISION);
        assert!(!cli.differs_from_committed("a.py"));
        assert_eq!(
            cli.classify_working_dir_status("a.py"),
            WorkingDirStatus::Unknown
        );
        assert!(!cli.is_available());
        assert!(cli.current_branch().is_none());
    }

    #[test]
    fn test_outside_repository_reports_unknown_revision() {
        if !git_installed() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let cli = GitCli::new(temp.path());
        assert_eq!(cli.current_revision("a.py"), UNKNOWN_REVISION);
        assert!(!cli.is_available());
    }

    #[test]
    fn test_drift_round_trip() {
        if !git_installed() {
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path(), "a.py", "print('hi')\n");
        let cli = GitCli::new(temp.path());

        let revision = cli.current_revision("a.py");
        assert_ne!(revision, UNKNOWN_REVISION);
        assert!(!cli.differs_from_committed("a.py"));
        let committed_id = cli.working_directory_id("a.py");
        assert_eq!(committed_id.as_str(), format!("a.py:{}", revision));

        fs::write(temp.path().join("a.py"), "print('changed')\n").unwrap();
        assert!(cli.differs_from_committed("a.py"));
        let drifted = cli.working_directory_id("a.py");
        assert!(!drifted.is_committed_form());
        assert!(drifted.as_str().starts_with("a.py:working_dir_"));

        fs::write(temp.path().join("a.py"), "print('hi')\n").unwrap();
        assert!(!cli.differs_from_committed("a.py"));
        assert_eq!(cli.working_directory_id("a.py"), committed_id);
    }

    #[test]
    fn test_untracked_file_differs() {
        if !git_installed() {
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path(), "a.py", "x = 1\n");
        fs::write(temp.path().join("new.py"), "y = 2\n").unwrap();

        let cli = GitCli::new(temp.path());
        assert!(cli.differs_from_committed("new.py"));
        assert_eq!(
            cli.classify_working_dir_status("new.py"),
            WorkingDirStatus::Untracked
        );
    }

    #[test]
    fn test_classification_priority() {
        if !git_installed() {
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path(), "a.py", "x = 1\n");
        let cli = GitCli::new(temp.path());
        assert!(cli.is_available());
        assert_eq!(
            cli.classify_working_dir_status("a.py"),
            WorkingDirStatus::Committed
        );

        fs::write(temp.path().join("a.py"), "x = 2\n").unwrap();
        assert_eq!(
            cli.classify_working_dir_status("a.py"),
            WorkingDirStatus::Unstaged
        );

        git(temp.path(), &["add", "a.py"]);
        assert_eq!(
            cli.classify_working_dir_status("a.py"),
            WorkingDirStatus::Staged
        );

        // Staged wins over a further unstaged edit.
        fs::write(temp.path().join("a.py"), "x = 3\n").unwrap();
        assert_eq!(
            cli.classify_working_dir_status("a.py"),
            WorkingDirStatus::Staged
        );
    }

    #[test]
    fn test_branch_listing_helpers() {
        if !git_installed() {
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path(), "a.py", "x = 1\n");
        git(temp.path(), &["checkout", "-q", "-b", "feature"]);
        fs::write(temp.path().join("b.py"), "y = 1\n").unwrap();
        git(temp.path(), &["add", "b.py"]);
        git(temp.path(), &["commit", "-q", "-m", "add b"]);

        let cli = GitCli::new(temp.path());
        assert_eq!(cli.current_branch().as_deref(), Some("feature"));
        assert_eq!(
            cli.changed_files_between("HEAD~1", "HEAD"),
            Some(vec!["b.py".to_string()])
        );
        let mut tracked = cli.tracked_files().unwrap();
        tracked.sort();
        assert_eq!(tracked, vec!["a.py".to_string(), "b.py".to_string()]);
    }
}
