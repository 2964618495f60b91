//! Console fallback parser for unstructured test-runner output.
//!
//! Runs the normalization stages from `compressor::console`, then tries an
//! ordered list of failure extractors. The first extractor that yields any
//! record wins; the generic scanner only runs when the styled patterns found
//! nothing.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::compressor::{
    compress_stack_trace, compress_text, normalize, strip_ansi, without_repeat_marker,
    CONSOLE_FIRST_LINES, CONSOLE_LAST_LINES,
};
use crate::types::{CompressionStats, FailureRecord, Framework, ParseResult};

pub const EMPTY_INPUT_ERROR: &str = "Console output is empty; nothing to parse";

pub const NO_FAILURES_WARNING: &str =
    "No failures could be extracted from console output; see the compressed output for context";

/// Console parse outcome: the result plus the compressed text it was built from.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConsoleDigest {
    pub result: ParseResult,
    pub compressed: String,
    pub stats: CompressionStats,
}

type Extractor = fn(&str) -> Vec<FailureRecord>;

/// Tried in order; the first non-empty result short-circuits the rest.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("block", extract_blocks),
    ("single-line", extract_single_lines),
    ("generic", extract_generic_errors),
];

// Jest-style blocks
static FAIL_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*FAIL\s+(\S+)").unwrap());
static PASS_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*PASS\s+\S+").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*●\s+(.+?)\s*$").unwrap());

// pytest short test summary: `FAILED path::test - message`. The path may
// carry a drive prefix, and parametrized ids may hold spaces inside `[...]`.
static SINGLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:FAILED|ERROR)\s+)?((?:[A-Za-z]:[\\/])?[^\s:]+)::(\S+?(?:\[[^\]]*\])?)\s+-\s+(.+?)\s*$",
    )
    .unwrap()
});

static GENERIC_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\w*error|failed|failure)\s*:\s*(\S.*)$").unwrap());

static FILE_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w./\\-]+\.[A-Za-z]{1,5}):\d+").unwrap());


// Run summaries
static JS_TEST_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Tests:\s+(?:(\d+) failed,\s+)?(?:\d+ skipped,\s+)?(?:\d+ todo,\s+)?(?:(\d+) passed,\s+)?(\d+) total",
    )
    .unwrap()
});

static CARGO_TEST_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"test result: \w+\. (\d+) passed; (\d+) failed").unwrap());

static PYTEST_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) (passed|failed|errors?|skipped)").unwrap());

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Time:\s*|finished in |\bin )(\d+(?:\.\d+)?)\s*s\b").unwrap()
});

/// Parse raw console output. Total: never fails, never panics.
pub fn parse(raw: &str) -> ConsoleDigest {
    if raw.trim().is_empty() {
        return ConsoleDigest {
            result: ParseResult::failed(Framework::Console, EMPTY_INPUT_ERROR),
            compressed: String::new(),
            stats: CompressionStats::new(raw.len(), 0),
        };
    }

    let stripped = strip_ansi(raw);
    let filtered = normalize(&stripped);
    let records = extract_failures(&filtered);
    let compressed = compress_text(&filtered);
    let stats = CompressionStats::new(raw.len(), compressed.len());

    let (total, passed) = summary_counts(&stripped).unwrap_or((0, 0));
    let result = ParseResult::from_records(Framework::Console, total, passed, records)
        .with_duration(extract_duration(&stripped));
    let result = if result.failed_records.is_empty() {
        result.with_warning(NO_FAILURES_WARNING)
    } else {
        result
    };

    debug!(
        original = stats.original_size,
        compressed = stats.compressed_size,
        failures = result.failed_tests,
        "console output compressed"
    );

    ConsoleDigest {
        result,
        compressed,
        stats,
    }
}

/// Run the extractors in order over normalized text.
pub fn extract_failures(text: &str) -> Vec<FailureRecord> {
    for (name, extractor) in EXTRACTORS {
        let records = extractor(text);
        if !records.is_empty() {
            debug!(extractor = name, count = records.len(), "console failures extracted");
            return records;
        }
    }
    Vec::new()
}

// ── Extractors ──────────────────────────────────────────────────────────────

struct Block<'a> {
    title: String,
    file: &'a str,
    lines: Vec<&'a str>,
}

/// `FAIL <path>` headers followed by `● <title>` blocks. A block runs until
/// the next bullet, the next suite header, or the end of input.
fn extract_blocks(text: &str) -> Vec<FailureRecord> {
    let mut records = Vec::new();
    let mut current_file: Option<&str> = None;
    let mut block: Option<Block> = None;

    for line in text.lines() {
        if let Some(caps) = FAIL_HEADER.captures(line) {
            flush_block(block.take(), &mut records);
            current_file = caps.get(1).map(|m| m.as_str());
        } else if PASS_HEADER.is_match(line) {
            flush_block(block.take(), &mut records);
            current_file = None;
        } else if let Some(caps) = BULLET.captures(line) {
            flush_block(block.take(), &mut records);
            if let Some(file) = current_file {
                block = Some(Block {
                    title: without_repeat_marker(&caps[1]).to_string(),
                    file,
                    lines: Vec::new(),
                });
            }
        } else if let Some(current) = block.as_mut() {
            current.lines.push(line);
        }
    }
    flush_block(block, &mut records);

    records
}

fn flush_block(block: Option<Block>, records: &mut Vec<FailureRecord>) {
    let Some(block) = block else {
        return;
    };
    let body = dedent(&block.lines);
    let message = if body.is_empty() { block.title.as_str() } else { body.as_str() };
    records.push(FailureRecord::new(
        block.title.as_str(),
        block.file,
        message,
        compress_stack_trace(&body, CONSOLE_FIRST_LINES, CONSOLE_LAST_LINES),
    ));
}

/// `path::test - message` lines.
fn extract_single_lines(text: &str) -> Vec<FailureRecord> {
    text.lines()
        .filter_map(|line| SINGLE_LINE.captures(without_repeat_marker(line)))
        .map(|caps| {
            let message = caps[3].to_string();
            FailureRecord::new(
                &caps[2],
                &caps[1],
                &message,
                compress_stack_trace(&message, CONSOLE_FIRST_LINES, CONSOLE_LAST_LINES),
            )
        })
        .collect()
}

/// Any `...Error:` / `Failed:` line, with the indented lines that follow it.
fn extract_generic_errors(text: &str) -> Vec<FailureRecord> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line = without_repeat_marker(line);
        let Some(caps) = GENERIC_ERROR.captures(line) else {
            continue;
        };
        let Some(kind) = caps.get(1) else {
            continue;
        };

        let message = line[kind.start()..].trim();
        let context: Vec<&str> = lines[idx + 1..]
            .iter()
            .take_while(|l| l.starts_with(' ') || l.starts_with('\t'))
            .copied()
            .collect();
        let mut block = vec![line.trim()];
        block.extend(context.iter().map(|l| l.trim_end()));
        let trace = block.join("\n");

        let file_path = FILE_LOCATION
            .captures(line)
            .or_else(|| context.iter().find_map(|l| FILE_LOCATION.captures(l)))
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        records.push(FailureRecord::new(
            kind.as_str(),
            file_path,
            message,
            compress_stack_trace(&trace, CONSOLE_FIRST_LINES, CONSOLE_LAST_LINES),
        ));
    }

    records
}

/// Join lines with their common leading whitespace removed.
fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or(l.trim_start()).trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ── Run summary ─────────────────────────────────────────────────────────────

/// `(total, passed)` from a runner summary line, if one is present.
fn summary_counts(text: &str) -> Option<(usize, usize)> {
    if let Some(caps) = JS_TEST_SUMMARY.captures(text) {
        let passed = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        let total = caps[3].parse().unwrap_or(0);
        return Some((total, passed));
    }

    let mut cargo_seen = false;
    let (mut passed, mut failed) = (0usize, 0usize);
    for caps in CARGO_TEST_SUMMARY.captures_iter(text) {
        cargo_seen = true;
        passed += caps[1].parse::<usize>().unwrap_or(0);
        failed += caps[2].parse::<usize>().unwrap_or(0);
    }
    if cargo_seen {
        return Some((passed + failed, passed));
    }

    // pytest: `==== 1 failed, 2 passed in 0.12s ====`
    let summary_line = text.lines().rev().find(|l| {
        l.contains("==") && (l.contains(" passed") || l.contains(" failed")) && l.contains(" in ")
    })?;
    let mut total = 0;
    let mut passed = 0;
    for caps in PYTEST_COUNT.captures_iter(summary_line) {
        let count: usize = caps[1].parse().unwrap_or(0);
        total += count;
        if &caps[2] == "passed" {
            passed = count;
        }
    }
    Some((total, passed))
}

/// Run duration in seconds from the last timing line.
fn extract_duration(text: &str) -> Option<f64> {
    text.lines()
        .rev()
        .find_map(|line| DURATION.captures(line))
        .and_then(|caps| caps[1].parse().ok())
}
