//! CLI definition and command dispatch for bdx.
//!
//! ## Configuration Precedence
//!
//! 1. CLI flags (e.g., `--config`, `--store`)
//! 2. Environment variables (`BDX_CONFIG`, `BDX_STORE`, `BDX_VERBOSE`, ...)
//! 3. Config file (`~/.bdx/config.yaml` or the path from `--config`)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use bdx_core::{BdxError, CollectionLocks, IndexEngine, IndexerConfig, ProgressEvent};
use bdx_db::{open_point_store, PointStoreConfig};

use crate::ui::{format, table, ColorMode, MessageType, Progress, ProgressMode, Style, SwitchProgress};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Store directory used when `--store` is not given, relative to the repo.
const DEFAULT_STORE_DIR: &str = ".bdx/store";

/// bdx – branch-aware content indexer for git repositories
#[derive(Parser, Debug)]
#[command(name = "bdx")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "BDX_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "BDX_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.bdx/config.yaml)
    #[arg(long, global = true, env = "BDX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Repository root
    #[arg(long, global = true, env = "BDX_REPO", default_value = ".")]
    pub repo: PathBuf,

    /// Point store directory (default: <repo>/.bdx/store)
    #[arg(long, global = true, env = "BDX_STORE")]
    pub store: Option<PathBuf>,

    /// Collection holding the index
    #[arg(long, global = true, env = "BDX_COLLECTION", default_value = "default")]
    pub collection: String,

    /// Color output mode: always, never, or auto
    #[arg(long, global = true, env = "BDX_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index files of a branch from scratch (all tracked files by default)
    #[command(after_help = r#"EXAMPLES:
    # Index every tracked file of the checked-out branch
    bdx index

    # Index specific files under an explicit branch name
    bdx index --branch main src/lib.rs src/main.rs
"#)]
    Index {
        /// Branch to index under (default: checked-out branch)
        #[arg(long)]
        branch: Option<String>,

        /// Files to index, relative to the repository root
        files: Vec<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Apply a branch switch to the index
    #[command(after_help = r#"EXAMPLES:
    # After `git checkout feature`, derive changed files from git
    bdx switch --from main

    # Pass the file lists explicitly
    bdx switch --from main --to feature --changed src/a.rs --unchanged src/b.rs

    # Stop at the first failing file
    bdx switch --from main --fail-fast
"#)]
    Switch {
        /// Branch being left
        #[arg(long)]
        from: String,

        /// Branch being entered (default: checked-out branch)
        #[arg(long)]
        to: Option<String>,

        /// Files whose content changed (derived from git when no list is given)
        #[arg(long, num_args = 1..)]
        changed: Vec<String>,

        /// Files whose content is the same on both branches
        #[arg(long, num_args = 1..)]
        unchanged: Vec<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Search content visible on a branch
    #[command(after_help = r#"EXAMPLES:
    bdx search "parse config file"
    bdx search "retry policy" --branch feature --limit 5 --json
"#)]
    Search {
        /// Query text
        query: String,

        /// Branch to search (default: checked-out branch)
        #[arg(long)]
        branch: Option<String>,

        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Hide every chunk of a branch (content is kept for reuse)
    Cleanup {
        /// Branch to hide
        branch: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Delete content points no branch can see
    Gc {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show working-tree drift of files
    Drift {
        /// Files to check (default: all tracked files)
        files: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show point counts of the collection
    Stats {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Flags shared by indexing commands.
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Interrupt at the first file that fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Interrupt after this many files
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Entry Point
// ============================================================================

/// Parse arguments, run the command and map the outcome to an exit code.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "bdx_core={},bdx_db={},bdx_cli={}",
        log_level, log_level, log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color_mode = ColorMode::parse(&cli.color).unwrap_or_default();
    let style = Style::new(color_mode);

    let engine = match build_engine(&cli) {
        Ok(engine) => engine,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check ~/.bdx/config.yaml and the --store directory".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context("Failed to initialize bdx", Some(&e.to_string()), Some(&hint))
            );
            return ExitCode::FAILURE;
        }
    };

    let ctx = Context {
        engine: &engine,
        style: &style,
        collection: &cli.collection,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Command::Index { branch, files, run } => handle_index(&ctx, branch, files, run),
        Command::Switch {
            from,
            to,
            changed,
            unchanged,
            run,
        } => handle_switch(&ctx, from, to, changed, unchanged, run),
        Command::Search {
            query,
            branch,
            limit,
            json,
        } => handle_search(&ctx, query, branch, limit, json),
        Command::Cleanup { branch, json } => handle_cleanup(&ctx, branch, json),
        Command::Gc { json } => handle_gc(&ctx, json),
        Command::Drift { files, json } => handle_drift(&ctx, files, json),
        Command::Stats { json } => handle_stats(&ctx, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn build_engine(cli: &Cli) -> anyhow::Result<IndexEngine> {
    let config = match &cli.config {
        Some(path) => IndexerConfig::from_path(path)?,
        None => IndexerConfig::load_default()?,
    };
    config.validate()?;

    let store_dir = cli
        .store
        .clone()
        .unwrap_or_else(|| cli.repo.join(DEFAULT_STORE_DIR));
    debug!("Opening point store at {}", store_dir.display());
    let store = open_point_store(&PointStoreConfig::persistent(store_dir.clone()))?;

    Ok(IndexEngine::new(cli.repo.clone(), Arc::clone(&store), config)
        .with_locks(CollectionLocks::new(store_dir)))
}

// ============================================================================
// Command handlers
// ============================================================================

struct Context<'a> {
    engine: &'a IndexEngine,
    style: &'a Style,
    collection: &'a str,
    quiet: bool,
    verbose: bool,
}

impl Context<'_> {
    fn mode(&self, json: bool) -> ProgressMode {
        ProgressMode::detect(self.quiet, json)
    }

    /// Resolve an optional branch flag to the checked-out branch.
    fn branch_or_current(&self, branch: Option<String>) -> Result<String, BdxError> {
        match branch {
            Some(branch) => Ok(branch),
            None => self
                .engine
                .git()
                .current_branch()
                .ok_or_else(|| BdxError::GitUnavailable {
                    operation: "determine the checked-out branch (pass --branch/--to)".to_string(),
                }),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BdxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_index(
    ctx: &Context<'_>,
    branch: Option<String>,
    files: Vec<String>,
    run: RunArgs,
) -> Result<(), BdxError> {
    let branch = ctx.branch_or_current(branch)?;
    let files = if files.is_empty() {
        ctx.engine
            .git()
            .tracked_files()
            .ok_or_else(|| BdxError::GitUnavailable {
                operation: "list tracked files (pass the files explicitly)".to_string(),
            })?
    } else {
        files
    };
    run_switch(ctx, &branch, &branch, files, Vec::new(), run)
}

fn handle_switch(
    ctx: &Context<'_>,
    from: String,
    to: Option<String>,
    changed: Vec<String>,
    unchanged: Vec<String>,
    run: RunArgs,
) -> Result<(), BdxError> {
    let to = ctx.branch_or_current(to)?;
    let (changed, unchanged) = if changed.is_empty() && unchanged.is_empty() {
        let plan = ctx.engine.plan_switch(&from, &to)?;
        (plan.changed, plan.unchanged)
    } else {
        (changed, unchanged)
    };
    run_switch(ctx, &from, &to, changed, unchanged, run)
}

fn run_switch(
    ctx: &Context<'_>,
    from: &str,
    to: &str,
    changed: Vec<String>,
    unchanged: Vec<String>,
    run: RunArgs,
) -> Result<(), BdxError> {
    let mode = ctx.mode(run.json);
    let total = changed.len() + unchanged.len();
    let mut progress = SwitchProgress::new(total, mode)
        .with_fail_fast(run.fail_fast)
        .with_max_files(run.max_files)
        .with_verbose(ctx.verbose);
    let mut callback = |event: &ProgressEvent| progress.on_event(event);

    let result = ctx.engine.switch_branch(
        from,
        to,
        &changed,
        &unchanged,
        ctx.collection,
        Some(&mut callback),
    );
    progress.finish();
    let result = result?;

    if run.json {
        return print_json(&result);
    }
    if !mode.prints_messages() {
        return Ok(());
    }

    let style = ctx.style;
    let headline = format!(
        "Indexed {} of {} files for `{}` in {}",
        result.files_processed,
        total,
        to,
        format::format_seconds(result.processing_time)
    );
    println!("{}", style.message(MessageType::Ok, &headline));
    println!(
        "{}",
        style.message_detail(
            "Content",
            &format!(
                "{} created, {} reused",
                result.content_points_created, result.content_points_reused
            )
        )
    );
    println!(
        "{}",
        style.message_detail(
            "Visibility",
            &format!(
                "{} created, {} updated, {} hidden",
                result.visibility_points_created,
                result.visibility_points_updated,
                result.visibility_points_hidden
            )
        )
    );
    if result.files_failed > 0 {
        println!(
            "{}",
            style.message(
                MessageType::Warn,
                &format!("{} files failed", result.files_failed)
            )
        );
        for (file, error) in progress.errors() {
            println!("{}", style.message_detail(&style.file_path(file), error));
        }
    }
    if result.interrupted {
        println!(
            "{}",
            style.message(
                MessageType::Hint,
                "Interrupted early; rerun the same command to finish the switch"
            )
        );
    }
    Ok(())
}

fn handle_search(
    ctx: &Context<'_>,
    query: String,
    branch: Option<String>,
    limit: usize,
    json: bool,
) -> Result<(), BdxError> {
    let branch = ctx.branch_or_current(branch)?;
    let spinner = Progress::spinner("Searching...", ctx.mode(json));
    let results = ctx.engine.search(&query, &branch, limit, ctx.collection);
    spinner.finish_clear();
    let results = results?;

    if json {
        return print_json(&results);
    }
    if results.is_empty() {
        println!(
            "{}",
            ctx.style
                .message(MessageType::Info, &format!("No results visible on `{}`", branch))
        );
        return Ok(());
    }
    println!("{}", table::render_search_table(&results));
    Ok(())
}

fn handle_cleanup(ctx: &Context<'_>, branch: String, json: bool) -> Result<(), BdxError> {
    let result = ctx.engine.cleanup_branch(&branch, ctx.collection)?;
    if json {
        return print_json(&result);
    }
    println!(
        "{}",
        ctx.style.message(
            MessageType::Ok,
            &format!(
                "Hid {} chunks of `{}`",
                result.visibility_points_hidden, branch
            )
        )
    );
    if !ctx.quiet {
        println!(
            "{}",
            ctx.style
                .message(MessageType::Hint, "Run `bdx gc` to delete content no branch can see")
        );
    }
    Ok(())
}

fn handle_gc(ctx: &Context<'_>, json: bool) -> Result<(), BdxError> {
    let spinner = Progress::spinner("Collecting orphaned content...", ctx.mode(json));
    let result = ctx.engine.garbage_collect(ctx.collection);
    spinner.finish_clear();
    let result = result?;

    if json {
        return print_json(&result);
    }
    println!(
        "{}",
        ctx.style.message(
            MessageType::Ok,
            &format!(
                "Deleted {} orphaned content points, preserved {}",
                result.content_points_deleted, result.content_points_preserved
            )
        )
    );
    Ok(())
}

fn handle_drift(ctx: &Context<'_>, files: Vec<String>, json: bool) -> Result<(), BdxError> {
    let files = if files.is_empty() {
        ctx.engine
            .git()
            .tracked_files()
            .ok_or_else(|| BdxError::GitUnavailable {
                operation: "list tracked files (pass the files explicitly)".to_string(),
            })?
    } else {
        files
    };
    let reports = ctx.engine.drift(&files);

    if json {
        return print_json(&reports);
    }
    let drifted = reports.iter().filter(|r| r.differs_from_committed).count();
    println!("{}", table::render_drift_table(&reports));
    println!();
    println!(
        "{}",
        ctx.style.message(
            MessageType::Info,
            &format!("{} of {} files differ from HEAD", drifted, reports.len())
        )
    );
    Ok(())
}

fn handle_stats(ctx: &Context<'_>, json: bool) -> Result<(), BdxError> {
    let stats = ctx.engine.stats(ctx.collection)?;
    if json {
        return print_json(&stats);
    }

    let style = ctx.style;
    println!("{}", style.section("STATS"));
    println!();
    println!("  {}", style.key_value("Collection", &stats.collection));
    let branches = if stats.branches.is_empty() {
        "(none)".to_string()
    } else {
        stats.branches.join(", ")
    };
    println!("  {}", style.key_value("Branches", &branches));
    println!();
    println!("{}", table::render_stats_table(&stats));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_switch_parses_file_lists() {
        let cli = Cli::try_parse_from([
            "bdx",
            "switch",
            "--from",
            "main",
            "--to",
            "feature",
            "--changed",
            "a.py",
            "b.py",
            "--unchanged",
            "c.py",
            "--fail-fast",
        ])
        .unwrap();

        match cli.command {
            Command::Switch {
                from,
                to,
                changed,
                unchanged,
                run,
            } => {
                assert_eq!(from, "main");
                assert_eq!(to.as_deref(), Some("feature"));
                assert_eq!(changed, vec!["a.py", "b.py"]);
                assert_eq!(unchanged, vec!["c.py"]);
                assert!(run.fail_fast);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
