//! Shared test utilities for bdx-cli integration tests.

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;

/// Get a Command for the bdx binary, isolated from the user's home config.
#[allow(deprecated)]
pub fn bdx_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bdx").expect("bdx binary should exist");
    cmd.env("HOME", home)
        .env_remove("BDX_CONFIG")
        .env_remove("BDX_STORE")
        .env_remove("BDX_COLLECTION")
        .env_remove("BDX_REPO")
        .env("NO_COLOR", "1");
    cmd
}

/// Whether a working `git` binary is on PATH.
pub fn git_installed() -> bool {
    StdCommand::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
    let output = StdCommand::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("run git");
    assert!(output.status.success(), "git {:?} failed", args);
}

/// Initialise a repository whose single commit is on `main`.
pub fn init_repo(dir: &Path, files: &[(&str, &str)]) {
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    for (name, content) in files {
        std::fs::write(dir.join(name), content).expect("write file");
        git(dir, &["add", name]);
    }
    git(dir, &["commit", "-q", "-m", "initial"]);
    git(dir, &["branch", "-M", "main"]);
}
