//! # bdx CLI
//!
//! Command-line interface for the branch-aware content indexer.
//!
//! This binary provides human-friendly access to `bdx-core` functionality.
//! Run `bdx --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
