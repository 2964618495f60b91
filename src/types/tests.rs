use super::*;

#[test]
fn test_framework_display() {
    assert_eq!(Framework::Jest.to_string(), "jest");
    assert_eq!(Framework::Pytest.to_string(), "pytest");
    assert_eq!(Framework::Console.to_string(), "console");
    assert_eq!(Framework::Generic.to_string(), "generic");
    assert_eq!(Framework::Unknown.to_string(), "unknown");
}

#[test]
fn test_framework_from_str() {
    assert_eq!("JEST".parse::<Framework>().unwrap(), Framework::Jest);
    assert_eq!(" pytest ".parse::<Framework>().unwrap(), Framework::Pytest);
    assert_eq!("auto".parse::<Framework>().unwrap(), Framework::Unknown);
    assert!("mocha".parse::<Framework>().is_err());
}

#[test]
fn test_failure_record_truncates_message() {
    let long = "x".repeat(2_000);
    let record = FailureRecord::new("t", "a.js", &long, "");
    assert_eq!(record.error_message().chars().count(), MAX_ERROR_MESSAGE_CHARS);
    assert!(record.error_message().ends_with("..."));
}

#[test]
fn test_failure_record_truncation_counts_chars_not_bytes() {
    let long = "é".repeat(600);
    let record = FailureRecord::new("t", "a.py", &long, "");
    assert!(record.error_message().chars().count() <= MAX_ERROR_MESSAGE_CHARS);
}

#[test]
fn test_failure_record_short_message_unchanged() {
    let record = FailureRecord::new("adds", "sum.test.js", "expected 3", "trace");
    assert_eq!(record.test_name(), "adds");
    assert_eq!(record.file_path(), "sum.test.js");
    assert_eq!(record.error_message(), "expected 3");
    assert_eq!(record.stack_trace(), "trace");
}

#[test]
fn test_parse_result_failed_is_zeroed() {
    let result = ParseResult::failed(Framework::Jest, "File not found: x.json");
    assert_eq!(result.total_tests, 0);
    assert_eq!(result.passed_tests, 0);
    assert_eq!(result.failed_tests, 0);
    assert!(result.failed_records.is_empty());
    assert!(result.is_error());
    assert!(result.warning.is_none());
}

#[test]
fn test_parse_result_counts_follow_records() {
    let records = vec![
        FailureRecord::new("a", "a.py", "boom", ""),
        FailureRecord::new("b", "b.py", "boom", ""),
    ];
    let result = ParseResult::from_records(Framework::Pytest, 5, 3, records);
    assert_eq!(result.failed_tests, result.failed_records.len());
    assert_eq!(result.failed_tests, 2);
}

#[test]
fn test_parse_result_serialization_shape() {
    let result = ParseResult::from_records(Framework::Generic, 0, 0, Vec::new())
        .with_warning("nothing found");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["framework"], "generic");
    assert_eq!(json["warning"], "nothing found");
    assert!(json["error"].is_null());
    assert!(json.get("excluded_failures").is_none());
    assert!(json.get("duration_secs").is_none());
}

#[test]
fn test_compression_stats_reduction() {
    let stats = CompressionStats::new(200, 50);
    assert!((stats.reduction_percent - 75.0).abs() < f64::EPSILON);
}

#[test]
fn test_compression_stats_empty_original() {
    let stats = CompressionStats::new(0, 0);
    assert_eq!(stats.reduction_percent, 0.0);
}

#[test]
fn test_confidence_ordering() {
    assert!(Confidence::High > Confidence::Medium);
    assert!(Confidence::Medium > Confidence::Low);
    assert!(Confidence::Low > Confidence::None);
}

#[test]
fn test_config_serialization() {
    let config = DigestConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: DigestConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config.version, parsed.version);
    assert_eq!(config.first_lines, parsed.first_lines);
}

#[test]
fn test_config_line_defaults_when_missing() {
    let parsed: DigestConfig =
        serde_json::from_str(r#"{"version":"1.0.0","default_model":null}"#).unwrap();
    assert_eq!(parsed.first_lines, 10);
    assert_eq!(parsed.last_lines, 5);
    assert!(parsed.max_tokens.is_none());
}
