//! Best-effort parser for JSON reports of unknown shape.

use serde_json::Value;
use tracing::debug;

use super::{get_count, is_vendored, value_to_text};
use crate::compressor::{compress_stack_trace, STRUCTURED_FIRST_LINES, STRUCTURED_LAST_LINES};
use crate::types::{FailureRecord, Framework, ParseResult};

const TEST_ARRAY_KEYS: &[&str] = &["tests", "results", "testResults"];
const STATUS_KEYS: &[&str] = &["status", "outcome", "result"];
const NAME_KEYS: &[&str] = &["fullName", "name", "title", "nodeid", "test", "testName"];
const FILE_KEYS: &[&str] = &["file", "file_path", "filePath", "path", "filename", "location"];
const MESSAGE_KEYS: &[&str] = &[
    "message",
    "error",
    "failureMessage",
    "failureMessages",
    "failure",
    "longrepr",
    "details",
];
const TRACE_KEYS: &[&str] = &["stack", "stack_trace", "stackTrace", "traceback", "trace"];

const FAILED_STATUSES: &[&str] = &["failed", "fail", "failure", "error", "errored", "broken"];
const PASSED_STATUSES: &[&str] = &["passed", "pass", "success", "succeeded", "ok"];

const VENDORED_PATHS: &[&str] = &[
    "/node_modules/",
    "site-packages",
    "dist-packages",
    "/vendor/",
    "/.venv/",
];

pub const NO_DATA_WARNING: &str =
    "No recognizable test data in JSON report; try the console parser on the raw output instead";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Passed,
    Failed,
    Other,
}

pub fn parse(report: &Value) -> ParseResult {
    if let Some(tests) = find_tests(report).filter(|tests| !tests.is_empty()) {
        return parse_tests(tests);
    }

    if let Some(summary) = report.get("summary").filter(|s| s.is_object()) {
        debug!("generic report has no per-test data, using summary counts");
        return parse_summary(summary);
    }

    ParseResult::from_records(Framework::Generic, 0, 0, Vec::new()).with_warning(NO_DATA_WARNING)
}

/// A top-level array, or the first recognized non-empty array-valued key.
fn find_tests(report: &Value) -> Option<&[Value]> {
    if let Some(items) = report.as_array() {
        return Some(items.as_slice());
    }
    TEST_ARRAY_KEYS
        .iter()
        .filter_map(|key| report.get(*key).and_then(Value::as_array))
        .find(|items| !items.is_empty())
        .map(Vec::as_slice)
}

fn parse_tests(tests: &[Value]) -> ParseResult {
    let mut passed = 0;
    let mut records = Vec::new();
    let mut excluded = 0;

    for test in tests {
        match outcome(test) {
            Outcome::Passed => passed += 1,
            Outcome::Failed => {
                let file_path = first_text(test, FILE_KEYS);
                if is_vendored(&file_path, VENDORED_PATHS) {
                    excluded += 1;
                    continue;
                }
                let name = first_text(test, NAME_KEYS);
                let message = first_text(test, MESSAGE_KEYS);
                let trace = Some(first_text(test, TRACE_KEYS))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| message.clone());
                records.push(FailureRecord::new(
                    if name.is_empty() { "unnamed test".to_string() } else { name },
                    file_path,
                    &message,
                    compress_stack_trace(&trace, STRUCTURED_FIRST_LINES, STRUCTURED_LAST_LINES),
                ));
            }
            Outcome::Other => {}
        }
    }

    ParseResult::from_records(Framework::Generic, tests.len(), passed, records)
        .with_excluded(excluded)
}

/// Aggregate counts only; no records exist, so `failed_tests` comes from
/// the summary itself.
fn parse_summary(summary: &Value) -> ParseResult {
    let passed = get_count(summary, "passed").unwrap_or(0);
    let failed = get_count(summary, "failed").unwrap_or(0);
    let total = get_count(summary, "total").unwrap_or(passed + failed);

    let mut result = ParseResult::from_records(Framework::Generic, total, passed, Vec::new());
    result.failed_tests = failed;
    if failed > 0 {
        result.with_warning(format!(
            "Report has {failed} failure(s) but no per-test details; try the console parser for specifics"
        ))
    } else {
        result
    }
}

fn outcome(test: &Value) -> Outcome {
    for key in STATUS_KEYS {
        match test.get(*key) {
            Some(Value::String(status)) => {
                let status = status.to_lowercase();
                if FAILED_STATUSES.contains(&status.as_str()) {
                    return Outcome::Failed;
                }
                if PASSED_STATUSES.contains(&status.as_str()) {
                    return Outcome::Passed;
                }
                return Outcome::Other;
            }
            Some(Value::Bool(ok)) => return if *ok { Outcome::Passed } else { Outcome::Failed },
            _ => {}
        }
    }
    match test.get("passed") {
        Some(Value::Bool(true)) => Outcome::Passed,
        Some(Value::Bool(false)) => Outcome::Failed,
        _ => Outcome::Other,
    }
}

/// Text of the first present, non-empty key; objects are stringified.
fn first_text(test: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| test.get(*key))
        .map(value_to_text)
        .find(|text| !text.trim().is_empty())
        .unwrap_or_default()
}
