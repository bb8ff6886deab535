//! Progress indicators for long-running CLI operations.
//!
//! Uses `indicatif`. Progress is hidden when stdout is not a TTY, under
//! `--quiet`, and under `--json`.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use bdx_core::{ProgressControl, ProgressEvent};

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: animated spinners and bars
    Interactive,
    /// Non-TTY or quiet: only final results
    Quiet,
    /// Machine-readable output: nothing but the JSON document
    Silent,
}

impl ProgressMode {
    /// Detect the appropriate mode from environment and flags.
    pub fn detect(quiet: bool, json: bool) -> Self {
        if json {
            Self::Silent
        } else if quiet || !atty::is(atty::Stream::Stdout) {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Whether human-readable messages should be printed.
    pub fn prints_messages(&self) -> bool {
        !matches!(self, Self::Silent)
    }
}

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const BAR_CHARS: &str = "█░";

/// A spinner or progress bar that is a no-op outside interactive mode.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a spinner for indeterminate operations.
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner()
                .tick_chars(SPINNER_CHARS)
                .template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            pb.set_style(style);
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Create a progress bar for `total` steps.
    pub fn bar(total: u64, message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("[{bar:20.cyan/dim}] {percent:>3}% ({pos}/{len}) {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars(BAR_CHARS);
            pb.set_style(style);
            pb.set_message(message.to_string());
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    /// Print a line above the bar without corrupting it.
    pub fn println(&self, line: &str) {
        if self.bar.is_hidden() {
            eprintln!("{}", line);
        } else {
            self.bar.println(line);
        }
    }

    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }
}

// ============================================================================
// SwitchProgress
// ============================================================================

/// Progress callback state for `bdx switch`.
///
/// Moves the bar for every file, echoes per-file errors (and notes when
/// verbose), and interrupts the switch on the first error under
/// `--fail-fast` or once `--max-files` files have been handled.
pub struct SwitchProgress {
    progress: Progress,
    fail_fast: bool,
    max_files: Option<usize>,
    verbose: bool,
    errors: Vec<(String, String)>,
}

impl SwitchProgress {
    pub fn new(total: usize, mode: ProgressMode) -> Self {
        Self {
            progress: Progress::bar(total as u64, "Indexing", mode),
            fail_fast: false,
            max_files: None,
            verbose: false,
            errors: Vec::new(),
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Handle one progress event.
    pub fn on_event(&mut self, event: &ProgressEvent) -> ProgressControl {
        self.progress.set_position(event.current as u64);
        self.progress.set_message(&event.file_path);

        if let Some(error) = &event.error {
            self.progress
                .println(&format!("[warn] {}: {}", event.file_path, error));
            self.errors.push((event.file_path.clone(), error.clone()));
            if self.fail_fast {
                return ProgressControl::Interrupt;
            }
        } else if let (Some(info), true) = (&event.info, self.verbose) {
            self.progress
                .println(&format!("[info] {}: {}", event.file_path, info));
        }

        match self.max_files {
            Some(max) if event.current >= max => ProgressControl::Interrupt,
            _ => ProgressControl::Continue,
        }
    }

    /// Files that failed, with their error messages.
    pub fn errors(&self) -> &[(String, String)] {
        &self.errors
    }

    pub fn finish(&self) {
        self.progress.finish_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(current: usize, error: Option<&str>) -> ProgressEvent {
        ProgressEvent {
            current,
            total: 5,
            file_path: format!("f{}.py", current),
            info: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_progress_mode_detection() {
        assert_eq!(ProgressMode::detect(false, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, false), ProgressMode::Quiet);
        assert!(!ProgressMode::Silent.prints_messages());
    }

    #[test]
    fn test_switch_progress_continues_by_default() {
        let mut progress = SwitchProgress::new(5, ProgressMode::Silent);
        assert_eq!(progress.on_event(&event(1, Some("boom"))), ProgressControl::Continue);
        assert_eq!(progress.on_event(&event(2, None)), ProgressControl::Continue);
        assert_eq!(progress.errors().len(), 1);
    }

    #[test]
    fn test_fail_fast_interrupts_on_error() {
        let mut progress = SwitchProgress::new(5, ProgressMode::Silent).with_fail_fast(true);
        assert_eq!(progress.on_event(&event(1, None)), ProgressControl::Continue);
        assert_eq!(progress.on_event(&event(2, Some("boom"))), ProgressControl::Interrupt);
    }

    #[test]
    fn test_max_files_interrupts() {
        let mut progress = SwitchProgress::new(5, ProgressMode::Silent).with_max_files(Some(2));
        assert_eq!(progress.on_event(&event(1, None)), ProgressControl::Continue);
        assert_eq!(progress.on_event(&event(2, None)), ProgressControl::Interrupt);
    }
}
