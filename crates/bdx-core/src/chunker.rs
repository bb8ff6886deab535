//! Text chunking seam.
//!
//! The indexer consumes any [`TextChunker`]. [`LineChunker`] is the bundled
//! implementation: fixed windows of lines, no syntax awareness.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CHUNK_MAX_FILE_BYTES, DEFAULT_CHUNK_MAX_LINES};
use crate::errors::BdxError;

/// One indexable slice of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Chunk text.
    pub text: String,
    /// Zero-based index within the file.
    pub chunk_index: usize,
    /// Number of chunks the file produced.
    pub total_chunks: usize,
}

/// Trait for chunking strategies.
pub trait TextChunker: Send + Sync {
    /// Split the file at `path` into chunks.
    ///
    /// An empty result means the file has nothing worth indexing.
    fn chunk_file(&self, path: &Path) -> Result<Vec<TextChunk>, BdxError>;
}

/// Splits files into windows of at most `max_lines` lines.
#[derive(Debug, Clone)]
pub struct LineChunker {
    max_lines: usize,
    max_file_bytes: u64,
}

impl Default for LineChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_MAX_LINES, DEFAULT_CHUNK_MAX_FILE_BYTES)
    }
}

impl LineChunker {
    /// Create a chunker with the given window and file-size limit.
    pub fn new(max_lines: usize, max_file_bytes: u64) -> Self {
        Self {
            max_lines: max_lines.max(1),
            max_file_bytes,
        }
    }

    /// Chunk in-memory text.
    pub fn chunk_text(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = text.lines().collect();
        let windows: Vec<String> = lines
            .chunks(self.max_lines)
            .map(|window| window.join("\n"))
            .filter(|window| !window.trim().is_empty())
            .collect();

        let total_chunks = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| TextChunk {
                text,
                chunk_index,
                total_chunks,
            })
            .collect()
    }
}

impl TextChunker for LineChunker {
    fn chunk_file(&self, path: &Path) -> Result<Vec<TextChunk>, BdxError> {
        let size = fs::metadata(path)?.len();
        if size > self.max_file_bytes {
            return Err(BdxError::Chunking {
                path: path.display().to_string(),
                reason: format!(
                    "file is {} bytes, limit is {}",
                    size, self.max_file_bytes
                ),
            });
        }

        let bytes = fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|_| BdxError::Chunking {
            path: path.display().to_string(),
            reason: "file is not valid UTF-8".to_string(),
        })?;
        Ok(self.chunk_text(&text))
    }
}

/// Guess a file's language from its extension.
pub fn detect_language(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "rs" => "rust",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "sh" | "bash" | "zsh" => "shell",
        "sql" => "sql",
        "md" | "markdown" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "html" | "htm" => "html",
        "css" | "scss" => "css",
        _ => "text",
    }
}
