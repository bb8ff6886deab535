//! # CLI UI Module
//!
//! Styling, tables and progress for bdx CLI output. Everything here respects
//! `--color`, `NO_COLOR` and `--quiet`, and stays silent under `--json`.
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection
//! - `style`: Message prefixes and styling functions
//! - `format`: Number, duration and string formatters
//! - `table`: Tables for search results and collection stats
//! - `progress`: Progress bar driving the branch-switch callback

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode, SwitchProgress};
pub use style::{MessageType, Style};
