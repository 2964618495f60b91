//! Console text normalization: ANSI stripping, line deduplication,
//! boilerplate filtering and keyword-driven line selection.
//!
//! Every function here is total. The console fallback is the recovery path
//! for the rest of the pipeline, so nothing in this module may fail.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Lines longer than this are cut in `compress_text`.
pub const MAX_LINE_CHARS: usize = 500;

/// Below this many kept lines the keyword filter is considered too aggressive.
const MIN_KEPT_LINES: usize = 10;

/// Lines returned when the keyword filter is abandoned.
const FALLBACK_LINES: usize = 100;

const TRUNCATION_MARKER: &str = " ... [truncated]";

const SIGNAL_KEYWORDS: &[&str] = &[
    "error",
    "fail",
    "assert",
    "expected",
    "received",
    "undefined",
    "null",
    "exception",
    "test",
];

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

static REPEAT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[repeated \d+x\]$").unwrap());

static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // blank lines and separator rules
        r"^\s*$",
        r"^\s*[-=]{3,}\s*$",
        // runner summary headers
        r"(?i)^\s*(test suites|tests|snapshots|time|test files|duration):",
        r"(?i)^\s*ran all test suites",
        // coverage banners and tables
        r"(?i)^[\s=-]*coverage\b",
        r"(?i)^\s*-*\s*coverage:",
        r"(?i)^\s*(all files|file)\s*\|",
        r"(?i)%\s*stmts",
        r"^\s*-+(\|-+)+\|?\s*$",
        r"(?i)^\s*total\s+\d+\s+\d+",
        // stack frames through vendored or runtime-internal code
        r"(?i)^\s*at\s.*(node_modules|node:internal|internal/)",
        r#"(?i)^\s*file\s+".*(site-packages|dist-packages|/lib/python)"#,
        r"(?i)^\s*\S*(site-packages|dist-packages)/(_pytest|pluggy)/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Remove `ESC [ ... m` colour sequences.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Collapse repeated non-blank lines.
///
/// Lines are compared with whitespace runs normalized to a single space. The
/// first occurrence stays at its original position with its original
/// formatting; if it was seen more than once, ` [repeated Nx]` is appended.
/// Blank lines pass through untouched.
pub fn dedupe_lines(text: &str) -> String {
    let mut kept: Vec<(&str, usize)> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            kept.push((line, 1));
            continue;
        }
        let key = line.split_whitespace().collect::<Vec<_>>().join(" ");
        match seen.get(&key) {
            Some(&idx) => kept[idx].1 += 1,
            None => {
                seen.insert(key, kept.len());
                kept.push((line, 1));
            }
        }
    }

    kept.into_iter()
        .map(|(line, count)| {
            if count > 1 {
                format!("{line} [repeated {count}x]")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `line` without the ` [repeated Nx]` suffix added by `dedupe_lines`.
pub fn without_repeat_marker(line: &str) -> &str {
    match REPEAT_MARKER.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    }
}

/// Whether a line is runner boilerplate that carries no failure signal.
/// The dedup marker is ignored so repeated rules are still dropped.
pub fn is_boilerplate(line: &str) -> bool {
    let line = without_repeat_marker(line);
    BOILERPLATE.iter().any(|re| re.is_match(line))
}

/// Drop boilerplate lines.
pub fn filter_boilerplate(text: &str) -> String {
    text.lines()
        .filter(|line| !is_boilerplate(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stages 1-3: strip colour codes, deduplicate, drop boilerplate.
pub fn normalize(text: &str) -> String {
    let stripped = strip_ansi(text);
    let deduped = dedupe_lines(&stripped);
    filter_boilerplate(&deduped)
}

/// Keep only lines that look like failure context.
///
/// Long lines are cut to `MAX_LINE_CHARS`. A line survives if it contains a
/// signal keyword or is indented. When fewer than `MIN_KEPT_LINES` survive,
/// the first `FALLBACK_LINES` lines are returned instead.
pub fn compress_text(text: &str) -> String {
    let kept: Vec<String> = text
        .lines()
        .filter(|line| has_signal(line) || is_indented(line))
        .map(truncate_line)
        .collect();

    if kept.len() >= MIN_KEPT_LINES {
        return kept.join("\n");
    }

    text.lines()
        .take(FALLBACK_LINES)
        .map(truncate_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_signal(line: &str) -> bool {
    let lower = line.to_lowercase();
    SIGNAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn truncate_line(line: &str) -> String {
    if line.chars().count() <= MAX_LINE_CHARS {
        return line.to_string();
    }
    let head: String = line.chars().take(MAX_LINE_CHARS).collect();
    format!("{head}{TRUNCATION_MARKER}")
}
