//! Parser for `pytest --json-report` (pytest-json-report plugin) output.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use super::{get_count, get_str, is_vendored, value_to_text};
use crate::compressor::{compress_stack_trace, STRUCTURED_FIRST_LINES, STRUCTURED_LAST_LINES};
use crate::types::{FailureRecord, Framework, ParseResult};

const VENDORED_PATHS: &[&str] = &[
    "site-packages",
    "dist-packages",
    "/.venv/",
    "/venv/",
    "/lib/python",
];

/// Test phases in execution order.
const PHASES: &[&str] = &["setup", "call", "teardown"];

/// Lines at least this long are dropped unless they carry a failure signal.
const VERBOSE_LINE_CHARS: usize = 200;

const SIGNAL_KEYWORDS: &[&str] = &["assert", "error", "exception"];

static FILE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w./\\-]+\.py:\d+").unwrap());

pub fn parse(report: &Value) -> ParseResult {
    let summary = report.get("summary").cloned().unwrap_or(Value::Null);
    let passed = get_count(&summary, "passed").unwrap_or(0);
    let total = get_count(&summary, "total")
        .or_else(|| get_count(&summary, "collected"))
        .unwrap_or(0);
    let duration = report.get("duration").and_then(Value::as_f64);

    let mut records = Vec::new();
    let mut excluded = 0;

    let tests = report
        .get("tests")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for test in tests {
        if !is_failure(get_str(test, "outcome")) {
            continue;
        }

        let nodeid = get_str(test, "nodeid").unwrap_or_default();
        let phase = failing_phase(test);
        let file_path = test_file(nodeid, phase);

        if is_vendored(&file_path, VENDORED_PATHS) {
            debug!(nodeid = %nodeid, "skipping vendored pytest failure");
            excluded += 1;
            continue;
        }

        let message = phase.map(phase_message).unwrap_or_default();
        let trace = phase.map(phase_trace).unwrap_or_default();
        let test_name = if nodeid.is_empty() { "unnamed test" } else { nodeid };

        records.push(FailureRecord::new(
            test_name,
            file_path,
            &message,
            compress_stack_trace(&trace, STRUCTURED_FIRST_LINES, STRUCTURED_LAST_LINES),
        ));
    }

    ParseResult::from_records(Framework::Pytest, total, passed, records)
        .with_excluded(excluded)
        .with_duration(duration)
}

fn is_failure(outcome: Option<&str>) -> bool {
    matches!(outcome, Some("failed") | Some("error"))
}

/// First of setup/call/teardown whose outcome is a failure.
fn failing_phase(test: &Value) -> Option<&Value> {
    PHASES
        .iter()
        .filter_map(|name| test.get(*name))
        .find(|phase| is_failure(get_str(phase, "outcome")))
}

/// Project file of the test: the `nodeid` prefix, else the crash location.
fn test_file(nodeid: &str, phase: Option<&Value>) -> String {
    if let Some((path, _)) = nodeid.split_once("::") {
        return path.to_string();
    }
    phase
        .and_then(|p| p.get("crash"))
        .and_then(|crash| get_str(crash, "path"))
        .unwrap_or_default()
        .to_string()
}

/// Short failure message: the crash message, else the long representation.
fn phase_message(phase: &Value) -> String {
    let crash_message = phase
        .get("crash")
        .and_then(|crash| crash.get("message"))
        .map(value_to_text)
        .filter(|m| !m.trim().is_empty());
    let raw = crash_message
        .or_else(|| phase.get("longrepr").map(value_to_text))
        .unwrap_or_default();
    strip_introspection(&raw)
}

/// Traceback entries as `path:line: message`, else the long representation.
fn phase_trace(phase: &Value) -> String {
    if let Some(entries) = phase.get("traceback").and_then(Value::as_array) {
        let lines: Vec<String> = entries
            .iter()
            .map(|entry| {
                let path = get_str(entry, "path").unwrap_or("?");
                let line = entry.get("lineno").map(value_to_text).unwrap_or_default();
                let message = get_str(entry, "message").unwrap_or_default();
                if message.is_empty() {
                    format!("{path}:{line}")
                } else {
                    format!("{path}:{line}: {message}")
                }
            })
            .collect();
        if !lines.is_empty() {
            return lines.join("\n");
        }
    }
    let longrepr = phase.get("longrepr").map(value_to_text).unwrap_or_default();
    strip_introspection(&longrepr)
}

/// Drop over-verbose assertion-introspection lines.
///
/// Lines of `VERBOSE_LINE_CHARS` or more survive only if they mention an
/// assertion, error or exception, or reference a source file.
pub fn strip_introspection(text: &str) -> String {
    text.lines()
        .filter(|line| {
            if line.chars().count() < VERBOSE_LINE_CHARS {
                return true;
            }
            let lower = line.to_lowercase();
            SIGNAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) || FILE_REF.is_match(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use serde_json::json;

    fn failed_test(nodeid: &str, crash_path: &str, message: Value) -> Value {
        json!({
            "nodeid": nodeid,
            "lineno": 3,
            "outcome": "failed",
            "setup": {"outcome": "passed"},
            "call": {
                "outcome": "failed",
                "crash": {"path": crash_path, "lineno": 4, "message": message},
                "traceback": [{"path": crash_path, "lineno": 4, "message": "AssertionError"}],
                "longrepr": "def test():\n>       assert 1 == 2\nE       assert 1 == 2"
            },
            "teardown": {"outcome": "passed"}
        })
    }

    #[test]
    fn test_parse_failures_and_counts() {
        let report = json!({
            "duration": 0.42,
            "summary": {"passed": 4, "failed": 1, "total": 5, "collected": 5},
            "tests": [
                {"nodeid": "tests/test_ok.py::test_ok", "outcome": "passed"},
                failed_test("tests/test_math.py::test_add", "/repo/tests/test_math.py", json!("assert 1 == 2")),
            ]
        });
        let result = parse(&report);
        assert_eq!(result.framework, Framework::Pytest);
        assert_eq!(result.total_tests, 5);
        assert_eq!(result.passed_tests, 4);
        assert_eq!(result.failed_tests, 1);
        assert_eq!(result.duration_secs, Some(0.42));
        let record = &result.failed_records[0];
        assert_eq!(record.test_name(), "tests/test_math.py::test_add");
        assert_eq!(record.file_path(), "tests/test_math.py");
        assert_eq!(record.error_message(), "assert 1 == 2");
        assert_eq!(record.stack_trace(), "/repo/tests/test_math.py:4: AssertionError");
    }

    #[test]
    fn test_vendored_failure_excluded() {
        let report = json!({
            "duration": 1.0,
            "summary": {"failed": 2, "total": 2},
            "tests": [
                failed_test(".venv/lib/python3.11/site-packages/pkg/test_pkg.py::test_x", "x.py", json!("boom")),
                failed_test("tests/test_app.py::test_y", "tests/test_app.py", json!("boom")),
            ]
        });
        let result = parse(&report);
        assert_eq!(result.failed_records.len(), 1);
        assert_eq!(result.failed_records[0].file_path(), "tests/test_app.py");
        assert_eq!(result.excluded_failures, 1);
    }

    #[test]
    fn test_structured_crash_message_is_stringified() {
        let report = json!({
            "duration": 0.1,
            "summary": {"failed": 1, "total": 1},
            "tests": [failed_test("t.py::test_obj", "t.py", json!({"reason": "bad", "code": 7}))]
        });
        let result = parse(&report);
        assert!(result.error.is_none());
        let message = result.failed_records[0].error_message();
        assert!(message.contains("\"reason\":\"bad\""));
    }

    #[test]
    fn test_setup_error_is_reported() {
        let report = json!({
            "duration": 0.1,
            "summary": {"error": 1, "total": 1},
            "tests": [{
                "nodeid": "tests/test_db.py::test_query",
                "outcome": "error",
                "setup": {
                    "outcome": "failed",
                    "longrepr": "fixture 'db' not found"
                }
            }]
        });
        let result = parse(&report);
        assert_eq!(result.failed_tests, 1);
        let record = &result.failed_records[0];
        assert_eq!(record.error_message(), "fixture 'db' not found");
        assert_eq!(record.stack_trace(), "fixture 'db' not found");
    }

    #[test]
    fn test_structured_longrepr_does_not_abort() {
        let report = json!({
            "duration": 0.1,
            "summary": {"failed": 1, "total": 1},
            "tests": [{
                "nodeid": "tests/test_a.py::test_a",
                "outcome": "failed",
                "call": {"outcome": "failed", "longrepr": {"reprcrash": {"message": "boom"}}}
            }]
        });
        let result = parse(&report);
        assert_eq!(result.failed_tests, 1);
        assert!(result.failed_records[0].error_message().contains("boom"));
    }

    #[test]
    fn test_strip_introspection() {
        let noisy = format!("left = {}", "[1, 2, 3]".repeat(40));
        let signal = format!("E   AssertionError: {}", "x".repeat(250));
        let file_ref = format!("tests/test_a.py:12: in test_a {}", "y".repeat(250));
        let text = format!("short line\n{noisy}\n{signal}\n{file_ref}");
        let cleaned = strip_introspection(&text);
        assert!(cleaned.contains("short line"));
        assert!(!cleaned.contains("left = "));
        assert!(cleaned.contains("AssertionError"));
        assert!(cleaned.contains("tests/test_a.py:12"));
    }

    #[test]
    fn test_total_falls_back_to_collected() {
        let report = json!({"duration": 0.0, "summary": {"collected": 7}, "tests": []});
        assert_eq!(parse(&report).total_tests, 7);
    }
}
