//! End-to-end pipeline: read once, parse structured or console, fall back,
//! render a status summary and fit it to a token budget.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::read_input;
use crate::models::get_model_limit;
use crate::parsers::{console, parse_report_str};
use crate::tokens::{check_count, count_tokens};
use crate::types::{CompressionStats, Framework, ParseResult};

/// Token budget for the rendered summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    pub model_id: String,
    /// Explicit ceiling; the model limit applies when it is lower or absent
    pub max_tokens: Option<usize>,
}

impl Budget {
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// `min(max_tokens, model limit)`.
    pub fn ceiling(&self) -> usize {
        let model_limit = get_model_limit(&self.model_id);
        self.max_tokens
            .map_or(model_limit, |max| max.min(model_limit))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetCheck {
    pub within_limit: bool,
    pub token_count: usize,
    pub safe_limit: usize,
    /// Trailing failure records left out of the summary to fit the limit
    pub dropped_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    pub result: ParseResult,
    /// Normalized console text; present only when the console path ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CompressionStats>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetCheck>,
}

/// Digest a report or log file. Read failures become `result.error`.
pub fn digest_file(path: &Path, declared: Option<Framework>, budget: Option<&Budget>) -> Digest {
    match read_input(path) {
        Ok(content) => digest_text(&content, declared, budget),
        Err(err) => {
            let result = ParseResult::failed(declared.unwrap_or(Framework::Unknown), err.to_string());
            finish(result, None, None, budget)
        }
    }
}

/// Digest in-memory test output.
pub fn digest_text(content: &str, declared: Option<Framework>, budget: Option<&Budget>) -> Digest {
    if declared == Some(Framework::Console) {
        return console_digest(content, None, budget);
    }

    let structured = parse_report_str(content, declared);
    match fallback_reason(&structured) {
        None => finish(structured, None, None, budget),
        Some(reason) => {
            debug!(%reason, "structured parse unusable, falling back to console parser");
            console_digest(content, Some(reason), budget)
        }
    }
}

/// Why a structured result should be replaced by the console path, if it should.
fn fallback_reason(result: &ParseResult) -> Option<String> {
    if let Some(error) = &result.error {
        return Some(error.clone());
    }
    let no_data = result.total_tests == 0 && result.failed_records.is_empty();
    match &result.warning {
        Some(warning) if no_data => Some(warning.clone()),
        _ => None,
    }
}

fn console_digest(content: &str, fallback: Option<String>, budget: Option<&Budget>) -> Digest {
    let console::ConsoleDigest {
        mut result,
        compressed,
        stats,
    } = console::parse(content);

    if let Some(reason) = fallback {
        let note = format!("Structured parsing failed ({reason}); used console output instead");
        result.warning = Some(match result.warning.take() {
            Some(existing) => format!("{note}. {existing}"),
            None => note,
        });
    }

    finish(result, Some(compressed), Some(stats), budget)
}

fn finish(
    result: ParseResult,
    compressed: Option<String>,
    stats: Option<CompressionStats>,
    budget: Option<&Budget>,
) -> Digest {
    let (summary, budget) = match budget {
        Some(budget) => {
            let (summary, check) = fit_summary(&result, budget.ceiling());
            (summary, Some(check))
        }
        None => (render_summary(&result), None),
    };

    Digest {
        result,
        compressed,
        stats,
        summary,
        budget,
    }
}

/// Human-readable status message listing every failure record.
pub fn render_summary(result: &ParseResult) -> String {
    let blocks = record_blocks(result);
    assemble(&render_header(result), &blocks, 0)
}

/// Render with as many leading records as fit under the safe limit.
///
/// Records are dropped from the end. If even the header alone is over the
/// limit the header is returned with `within_limit == false`. Each record is
/// rendered once; the cut point is found by binary search, so the summary is
/// assembled O(log n) times.
pub fn fit_summary(result: &ParseResult, token_limit: usize) -> (String, BudgetCheck) {
    let header = render_header(result);
    let blocks = record_blocks(result);
    let total = blocks.len();

    let fits = |shown: usize| {
        let summary = assemble(&header, &blocks[..shown], total - shown);
        let check = check_count(count_tokens(&summary), token_limit);
        (summary, check)
    };

    let (mut summary, mut check) = fits(total);
    let mut shown = total;

    if !check.within_limit && total > 0 {
        // Below `total` every candidate carries the omitted-records line, and
        // the summary grows with each extra record.
        let (mut lo, mut hi) = (0, total - 1);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if fits(mid).1.within_limit {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        shown = lo;
        (summary, check) = fits(shown);
    }

    if !check.within_limit {
        warn!(
            token_count = check.token_count,
            safe_limit = check.safe_limit,
            "summary exceeds token budget even without failure details"
        );
    }

    let budget = BudgetCheck {
        within_limit: check.within_limit,
        token_count: check.token_count,
        safe_limit: check.safe_limit,
        dropped_records: total - shown,
    };
    (summary, budget)
}

fn assemble(header: &str, blocks: &[String], dropped: usize) -> String {
    let mut out = String::with_capacity(header.len() + blocks.iter().map(String::len).sum::<usize>());
    out.push_str(header);
    for block in blocks {
        out.push_str(block);
    }
    if dropped > 0 {
        let _ = write!(
            out,
            "\n... {dropped} more failure(s) omitted to fit the token budget\n"
        );
    }
    out
}

fn render_header(result: &ParseResult) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "Test results ({}): {} passed, {} failed, {} total",
        result.framework, result.passed_tests, result.failed_tests, result.total_tests
    );
    if let Some(secs) = result.duration_secs {
        let _ = write!(out, " in {secs:.2}s");
    }
    out.push('\n');

    if result.excluded_failures > 0 {
        let _ = writeln!(
            out,
            "Excluded {} failure(s) in vendored code",
            result.excluded_failures
        );
    }
    if let Some(error) = &result.error {
        let _ = writeln!(out, "Error: {error}");
    }
    if let Some(warning) = &result.warning {
        let _ = writeln!(out, "Warning: {warning}");
    }

    out
}

fn record_blocks(result: &ParseResult) -> Vec<String> {
    result
        .failed_records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut out = String::new();
            let _ = write!(out, "\n{}) {}\n", i + 1, record.test_name());
            if !record.file_path().is_empty() {
                let _ = writeln!(out, "   File: {}", record.file_path());
            }
            let _ = writeln!(out, "   Error: {}", record.error_message());
            let trace = record.stack_trace();
            if !trace.is_empty() && trace != record.error_message() {
                out.push_str("   Stack trace:\n");
                for line in trace.lines() {
                    let _ = writeln!(out, "     {line}");
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::types::FailureRecord;
    use serde_json::json;

    fn jest_report() -> String {
        json!({
            "numTotalTests": 3,
            "numPassedTests": 2,
            "numFailedTests": 1,
            "testResults": [{
                "name": "src/sum.test.js",
                "status": "failed",
                "assertionResults": [
                    {"fullName": "adds", "status": "passed", "failureMessages": []},
                    {"fullName": "subtracts", "status": "passed", "failureMessages": []},
                    {
                        "fullName": "divides",
                        "status": "failed",
                        "failureMessages": ["Error: expected 2\n    at src/sum.test.js:9:5"]
                    }
                ]
            }]
        })
        .to_string()
    }

    #[test]
    fn test_structured_report_does_not_fall_back() {
        let digest = digest_text(&jest_report(), None, None);
        assert_eq!(digest.result.framework, Framework::Jest);
        assert_eq!(digest.result.failed_tests, 1);
        assert!(digest.compressed.is_none());
        assert!(digest.stats.is_none());
        assert!(digest.summary.contains("1) divides"));
        assert!(digest.summary.contains("File: src/sum.test.js"));
    }

    #[test]
    fn test_plain_text_uses_console_path() {
        let log = "FAIL src/a.test.js\n  ● a › works\n\n    expect(received).toBe(expected)\n";
        let digest = digest_text(log, None, None);
        assert_eq!(digest.result.framework, Framework::Console);
        assert_eq!(digest.result.failed_records.len(), 1);
        assert!(digest.stats.is_some());
        assert!(digest.result.warning.unwrap().contains("used console output"));
    }

    #[test]
    fn test_declared_console_skips_fallback_note() {
        let digest = digest_text("Error: boom", Some(Framework::Console), None);
        assert_eq!(digest.result.framework, Framework::Console);
        assert!(digest
            .result
            .warning
            .as_deref()
            .map_or(true, |w| !w.contains("Structured parsing failed")));
    }

    #[test]
    fn test_empty_input_is_console_error() {
        let digest = digest_text("", None, None);
        assert_eq!(digest.result.framework, Framework::Console);
        assert!(digest.result.error.is_some());
        assert!(digest.result.failed_records.is_empty());
    }

    #[test]
    fn test_summary_counts_keep_structured_result() {
        let report = json!({"summary": {"passed": 3, "failed": 1}}).to_string();
        let digest = digest_text(&report, None, None);
        assert_eq!(digest.result.framework, Framework::Generic);
        assert_eq!(digest.result.failed_tests, 1);
    }

    #[test]
    fn test_missing_file_reports_error() {
        let digest = digest_file(Path::new("/definitely/not/here.json"), Some(Framework::Jest), None);
        assert_eq!(digest.result.framework, Framework::Jest);
        assert!(digest.result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_budget_ceiling() {
        let budget = Budget::for_model("gpt-4");
        assert_eq!(budget.ceiling(), 8_192);
        assert_eq!(budget.clone().with_max_tokens(Some(1_000)).ceiling(), 1_000);
        assert_eq!(budget.with_max_tokens(Some(1_000_000)).ceiling(), 8_192);
    }

    #[test]
    fn test_fit_summary_drops_trailing_records() {
        let records: Vec<FailureRecord> = (0..20)
            .map(|i| {
                FailureRecord::new(
                    format!("test {i}"),
                    "tests/test_x.py",
                    &"x".repeat(400),
                    "",
                )
            })
            .collect();
        let result = ParseResult::from_records(Framework::Pytest, 20, 0, records);

        let (full, check) = fit_summary(&result, 1_000_000);
        assert!(check.within_limit);
        assert_eq!(check.dropped_records, 0);
        assert!(full.contains("20) test 19"));

        let (fitted, check) = fit_summary(&result, 500);
        assert!(check.within_limit);
        assert!(check.dropped_records > 0);
        assert!(check.token_count <= check.safe_limit);
        assert!(fitted.contains("1) test 0"));
        assert!(fitted.contains(&format!("{} more failure(s) omitted", check.dropped_records)));
    }

    #[test]
    fn test_fit_summary_reports_over_limit_header() {
        let result = ParseResult::failed(Framework::Jest, "x".repeat(400));
        let (_, check) = fit_summary(&result, 10);
        assert!(!check.within_limit);
        assert_eq!(check.dropped_records, 0);
    }

    #[test]
    fn test_fit_summary_large_suite_keeps_longest_fitting_prefix() {
        let records: Vec<FailureRecord> = (0..4_000)
            .map(|i| FailureRecord::new(format!("test {i}"), "src/a.test.js", &"y".repeat(400), ""))
            .collect();
        let result = ParseResult::from_records(Framework::Jest, 4_000, 0, records);

        let (summary, check) = fit_summary(&result, 8_000);
        assert!(check.within_limit);
        assert!(check.dropped_records > 0);
        assert_eq!(check.token_count, count_tokens(&summary));

        // one more record would not fit
        let shown = 4_000 - check.dropped_records;
        let blocks = record_blocks(&result);
        let bigger = assemble(&render_header(&result), &blocks[..shown + 1], check.dropped_records - 1);
        assert!(!check_count(count_tokens(&bigger), 8_000).within_limit);
    }

    #[test]
    fn test_fit_summary_all_dropped_still_notes_count() {
        let records = vec![FailureRecord::new("t", "a.py", &"z".repeat(400), "")];
        let result = ParseResult::from_records(Framework::Pytest, 1, 0, records);
        let (summary, check) = fit_summary(&result, 40);
        assert_eq!(check.dropped_records, 1);
        assert!(summary.contains("1 more failure(s) omitted"));
    }
}
