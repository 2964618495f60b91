//! Text compressors shared by every parser.
//!
//! `compress_stack_trace` is the format-agnostic head/tail truncation applied
//! to each failure's trace; `console` holds the normalization stages used by
//! the console fallback and by the digest pipeline.

pub mod console;

pub use console::{
    compress_text, dedupe_lines, filter_boilerplate, normalize, strip_ansi, without_repeat_marker,
};

/// Head lines kept for traces pulled from structured reports.
pub const STRUCTURED_FIRST_LINES: usize = 10;
/// Tail lines kept for traces pulled from structured reports.
pub const STRUCTURED_LAST_LINES: usize = 5;
/// Head lines kept for error blocks extracted from console text.
pub const CONSOLE_FIRST_LINES: usize = 8;
/// Tail lines kept for error blocks extracted from console text.
pub const CONSOLE_LAST_LINES: usize = 3;

/// Keep the first `first_n` and last `last_n` lines of `text`, replacing the
/// middle with a single marker line.
///
/// Text with at most `first_n + last_n` lines is returned unchanged.
pub fn compress_stack_trace(text: &str, first_n: usize, last_n: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = text.lines().collect();
    let total_lines = lines.len();
    if total_lines <= first_n + last_n {
        return text.to_string();
    }

    let omitted = total_lines - first_n - last_n;
    let mut result: Vec<&str> = Vec::with_capacity(first_n + last_n + 1);
    result.extend_from_slice(&lines[..first_n]);
    let marker = omitted_marker(omitted);
    result.push(&marker);
    result.extend_from_slice(&lines[total_lines - last_n..]);
    result.join("\n")
}

fn omitted_marker(omitted: usize) -> String {
    if omitted == 1 {
        "... (1 line omitted) ...".to_string()
    } else {
        format!("... ({omitted} lines omitted) ...")
    }
}
