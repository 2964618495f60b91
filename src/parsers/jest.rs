//! Parser for `jest --json` reports.

use serde_json::Value;
use tracing::debug;

use super::{get_count, get_str, is_vendored, value_to_text};
use crate::compressor::{
    compress_stack_trace, strip_ansi, STRUCTURED_FIRST_LINES, STRUCTURED_LAST_LINES,
};
use crate::types::{FailureRecord, Framework, ParseResult};

const VENDORED_PATHS: &[&str] = &["/node_modules/"];

/// Title used when a suite fails before any test runs.
const SUITE_FAILURE_TITLE: &str = "Test suite failed to run";

pub fn parse(report: &Value) -> ParseResult {
    let total = get_count(report, "numTotalTests").unwrap_or(0);
    let passed = get_count(report, "numPassedTests").unwrap_or(0);

    let mut records = Vec::new();
    let mut excluded = 0;

    let suites = report
        .get("testResults")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for suite in suites {
        let file_path = get_str(suite, "name")
            .or_else(|| get_str(suite, "testFilePath"))
            .unwrap_or_default();
        let assertions = suite
            .get("assertionResults")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let failed: Vec<&Value> = assertions
            .iter()
            .filter(|a| get_str(a, "status") == Some("failed"))
            .collect();

        let suite_broken = failed.is_empty()
            && get_str(suite, "status") == Some("failed")
            && !suite_message(suite).is_empty();

        if is_vendored(file_path, VENDORED_PATHS) {
            let dropped = if suite_broken { 1 } else { failed.len() };
            if dropped > 0 {
                debug!(file = %file_path, dropped, "skipping vendored jest suite");
            }
            excluded += dropped;
            continue;
        }

        for assertion in failed {
            let message = failure_message(assertion);
            records.push(FailureRecord::new(
                test_name(assertion),
                file_path,
                &message,
                compress_stack_trace(&message, STRUCTURED_FIRST_LINES, STRUCTURED_LAST_LINES),
            ));
        }

        if suite_broken {
            let message = suite_message(suite);
            records.push(FailureRecord::new(
                SUITE_FAILURE_TITLE,
                file_path,
                &message,
                compress_stack_trace(&message, STRUCTURED_FIRST_LINES, STRUCTURED_LAST_LINES),
            ));
        }
    }

    ParseResult::from_records(Framework::Jest, total, passed, records).with_excluded(excluded)
}

/// `fullName`, else `ancestorTitles › title`.
fn test_name(assertion: &Value) -> String {
    if let Some(full) = get_str(assertion, "fullName").filter(|s| !s.is_empty()) {
        return full.to_string();
    }
    let mut parts: Vec<&str> = assertion
        .get("ancestorTitles")
        .and_then(Value::as_array)
        .map(|titles| titles.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if let Some(title) = get_str(assertion, "title") {
        parts.push(title);
    }
    if parts.is_empty() {
        "unnamed test".to_string()
    } else {
        parts.join(" › ")
    }
}

/// All `failureMessages` joined with newlines, colour codes removed.
fn failure_message(assertion: &Value) -> String {
    let joined = match assertion.get("failureMessages") {
        Some(Value::Array(parts)) => parts
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => value_to_text(other),
        None => String::new(),
    };
    strip_ansi(&joined)
}

fn suite_message(suite: &Value) -> String {
    let raw = suite
        .get("message")
        .or_else(|| suite.get("failureMessage"))
        .map(value_to_text)
        .unwrap_or_default();
    strip_ansi(raw.trim())
}
