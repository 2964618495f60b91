//! Report parsers: one per known JSON report shape plus the console fallback.
//!
//! Parsers never return `Err`. Input problems become `ParseResult::error`,
//! ambiguity becomes `ParseResult::warning`.

pub mod console;
pub mod generic;
pub mod jest;
pub mod pytest;

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{read_input, DigestError, DigestResult};
use crate::types::{Framework, ParseResult};

/// Known JSON report layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportShape {
    /// `jest --json`
    Jest,
    /// `pytest --json-report`
    Pytest,
    /// Anything else with a recognizable test array or summary
    Generic,
}

impl ReportShape {
    pub fn framework(self) -> Framework {
        match self {
            ReportShape::Jest => Framework::Jest,
            ReportShape::Pytest => Framework::Pytest,
            ReportShape::Generic => Framework::Generic,
        }
    }

    /// Shape forced by a declared framework, if it names a JSON format.
    fn from_declared(framework: Framework) -> Option<Self> {
        match framework {
            Framework::Jest => Some(ReportShape::Jest),
            Framework::Pytest => Some(ReportShape::Pytest),
            Framework::Generic => Some(ReportShape::Generic),
            Framework::Console | Framework::Unknown => None,
        }
    }
}

/// Sniff the report shape from characteristic top-level keys.
///
/// Test counters plus a `testResults` array mean Jest; a `summary` object
/// alongside a run `duration` means pytest-json-report.
pub fn identify(report: &Value) -> ReportShape {
    let Some(obj) = report.as_object() else {
        return ReportShape::Generic;
    };

    let has_counters = obj.contains_key("numTotalTests");
    let has_results = obj.get("testResults").is_some_and(Value::is_array);
    if has_counters && has_results {
        return ReportShape::Jest;
    }

    let has_summary = obj.get("summary").is_some_and(Value::is_object);
    if has_summary && obj.contains_key("duration") {
        return ReportShape::Pytest;
    }

    ReportShape::Generic
}

/// Read and parse a JSON report from disk. The file is read exactly once.
pub fn parse_report_file(path: &Path, declared: Option<Framework>) -> ParseResult {
    match read_input(path) {
        Ok(content) => parse_report_str(&content, declared),
        Err(err) => ParseResult::failed(declared.unwrap_or(Framework::Unknown), err.to_string()),
    }
}

/// Parse an in-memory JSON report.
///
/// A declared JSON framework overrides sniffing. `console` routes the text to
/// the console parser.
pub fn parse_report_str(content: &str, declared: Option<Framework>) -> ParseResult {
    if declared == Some(Framework::Console) {
        return console::parse(content).result;
    }

    let report = match decode(content) {
        Ok(report) => report,
        Err(err) => {
            return ParseResult::failed(declared.unwrap_or(Framework::Unknown), err.to_string())
        }
    };

    let shape = declared
        .and_then(ReportShape::from_declared)
        .unwrap_or_else(|| identify(&report));
    debug!(?shape, "parsing structured report");

    match shape {
        ReportShape::Jest => jest::parse(&report),
        ReportShape::Pytest => pytest::parse(&report),
        ReportShape::Generic => generic::parse(&report),
    }
}

/// Decode a report; only objects and arrays are accepted at the top level.
pub fn decode(content: &str) -> DigestResult<Value> {
    let value: Value = serde_json::from_str(content)?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        other => Err(DigestError::NotAnObject(json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Shared helpers ──────────────────────────────────────────────────────────

/// Whether `path` points into vendored or third-party code.
///
/// Separators are normalized and a leading `/` is assumed so directory
/// patterns like `/venv/` also match relative paths.
pub(crate) fn is_vendored(path: &str, patterns: &[&str]) -> bool {
    if path.is_empty() {
        return false;
    }
    let normalized = format!("/{}", path.replace('\\', "/"));
    patterns.iter().any(|p| normalized.contains(p))
}

/// Render any JSON value as display text. Strings are taken verbatim, arrays
/// of strings are joined with newlines, everything else is stringified.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

pub(crate) fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Read a non-negative count; floats and numeric strings are tolerated.
pub(crate) fn get_count(value: &Value, key: &str) -> Option<usize> {
    match value.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identify_jest() {
        let report = json!({"numTotalTests": 1, "testResults": []});
        assert_eq!(identify(&report), ReportShape::Jest);
    }

    #[test]
    fn test_identify_pytest() {
        let report = json!({"summary": {"total": 1}, "duration": 0.1, "tests": []});
        assert_eq!(identify(&report), ReportShape::Pytest);
    }

    #[test]
    fn test_identify_generic() {
        assert_eq!(identify(&json!({})), ReportShape::Generic);
        assert_eq!(identify(&json!({"summary": {}})), ReportShape::Generic);
        assert_eq!(identify(&json!({"numTotalTests": 3})), ReportShape::Generic);
        assert_eq!(identify(&json!([])), ReportShape::Generic);
    }

    #[test]
    fn test_malformed_json_is_error_result() {
        let result = parse_report_str("{not json", None);
        assert!(result.error.as_deref().unwrap().starts_with("Invalid JSON"));
        assert_eq!(result.total_tests, 0);
        assert!(result.failed_records.is_empty());
    }

    #[test]
    fn test_scalar_json_is_error_result() {
        let result = parse_report_str("42", Some(Framework::Jest));
        assert_eq!(result.framework, Framework::Jest);
        assert!(result.error.unwrap().contains("a number"));
    }

    #[test]
    fn test_missing_file_is_error_result() {
        let result = parse_report_file(Path::new("/no/such/report.json"), None);
        assert!(result.error.unwrap().starts_with("File not found"));
    }

    #[test]
    fn test_declared_framework_overrides_sniffing() {
        let report = r#"{"numTotalTests": 2, "testResults": [], "tests": [{"name": "a", "status": "failed"}]}"#;
        assert_eq!(parse_report_str(report, None).framework, Framework::Jest);
        let forced = parse_report_str(report, Some(Framework::Generic));
        assert_eq!(forced.framework, Framework::Generic);
        assert_eq!(forced.failed_tests, 1);
    }

    #[test]
    fn test_is_vendored() {
        let patterns = &["node_modules", "/venv/"];
        assert!(is_vendored("node_modules/lib/index.js", patterns));
        assert!(is_vendored("venv/lib/thing.py", patterns));
        assert!(is_vendored("C:\\proj\\node_modules\\x.js", patterns));
        assert!(!is_vendored("src/myvenv/thing.py", patterns));
        assert!(!is_vendored("", patterns));
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!(null)), "");
        assert_eq!(value_to_text(&json!("a")), "a");
        assert_eq!(value_to_text(&json!(["a", "b"])), "a\nb");
        assert_eq!(value_to_text(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn test_get_count_tolerates_types() {
        let v = json!({"a": 3, "b": "4", "c": 2.0, "d": -1, "e": true});
        assert_eq!(get_count(&v, "a"), Some(3));
        assert_eq!(get_count(&v, "b"), Some(4));
        assert_eq!(get_count(&v, "c"), Some(2));
        assert_eq!(get_count(&v, "d"), None);
        assert_eq!(get_count(&v, "e"), None);
        assert_eq!(get_count(&v, "missing"), None);
    }
}
