//! Formatting helpers for CLI output.

/// Truncate a string to `max_len` characters, ending with `...`.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{}...", kept)
}

/// First non-blank line of a chunk, used as a one-line preview.
pub fn preview_line(content: &str, max_len: usize) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    truncate_str(line, max_len)
}

/// Format a number with thousands separators.
pub fn format_thousands(n: usize) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Format a duration in seconds (`0.42s`, `12.3s`, `2m 05s`).
pub fn format_seconds(seconds: f64) -> String {
    if seconds < 10.0 {
        format!("{:.2}s", seconds)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        let total = seconds.round() as u64;
        format!("{}m {:02}s", total / 60, total % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 3), "...");
        assert_eq!(truncate_str("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_preview_line_skips_blank_lines() {
        assert_eq!(preview_line("\n\n   fn main() {}\nmore", 40), "fn main() {}");
        assert_eq!(preview_line("", 10), "");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.4211), "0.42s");
        assert_eq!(format_seconds(12.34), "12.3s");
        assert_eq!(format_seconds(125.0), "2m 05s");
    }
}
