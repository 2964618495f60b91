use serde::{Deserialize, Serialize};

/// Hard cap on `FailureRecord::error_message`, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Report format a `ParseResult` was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Jest,
    Pytest,
    Console,
    Generic,
    Unknown,
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framework::Jest => write!(f, "jest"),
            Framework::Pytest => write!(f, "pytest"),
            Framework::Console => write!(f, "console"),
            Framework::Generic => write!(f, "generic"),
            Framework::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jest" => Ok(Framework::Jest),
            "pytest" => Ok(Framework::Pytest),
            "console" | "text" => Ok(Framework::Console),
            "generic" | "json" => Ok(Framework::Generic),
            "unknown" | "auto" => Ok(Framework::Unknown),
            other => Err(format!(
                "unsupported framework '{other}' (expected jest, pytest, generic or console)"
            )),
        }
    }
}

/// One failing test, normalized across report formats.
///
/// Fields are private so the message cap cannot be bypassed after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    test_name: String,
    file_path: String,
    error_message: String,
    stack_trace: String,
}

impl FailureRecord {
    /// Build a record, truncating `error_message` to `MAX_ERROR_MESSAGE_CHARS`.
    /// `stack_trace` is stored as given; callers compress it first.
    pub fn new(
        test_name: impl Into<String>,
        file_path: impl Into<String>,
        error_message: &str,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            file_path: file_path.into(),
            error_message: truncate_message(error_message),
            stack_trace: stack_trace.into(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn stack_trace(&self) -> &str {
        &self.stack_trace
    }
}

/// Truncate to at most `MAX_ERROR_MESSAGE_CHARS` characters, marker included.
pub fn truncate_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_CHARS {
        return trimmed.to_string();
    }
    let kept: String = trimmed.chars().take(MAX_ERROR_MESSAGE_CHARS - 3).collect();
    format!("{kept}...")
}

/// Outcome of a single parse invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub framework: Framework,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub failed_records: Vec<FailureRecord>,
    pub error: Option<String>,
    pub warning: Option<String>,
    /// Failures dropped because they pointed into vendored code
    #[serde(skip_serializing_if = "is_zero")]
    pub excluded_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ParseResult {
    /// Zeroed result carrying an input error.
    pub fn failed(framework: Framework, error: impl Into<String>) -> Self {
        Self {
            framework,
            total_tests: 0,
            passed_tests: 0,
            failed_tests: 0,
            failed_records: Vec::new(),
            error: Some(error.into()),
            warning: None,
            excluded_failures: 0,
            duration_secs: None,
        }
    }

    /// Result whose failure count is the number of attributed records.
    pub fn from_records(
        framework: Framework,
        total_tests: usize,
        passed_tests: usize,
        failed_records: Vec<FailureRecord>,
    ) -> Self {
        Self {
            framework,
            total_tests,
            passed_tests,
            failed_tests: failed_records.len(),
            failed_records,
            error: None,
            warning: None,
            excluded_failures: 0,
            duration_secs: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn with_excluded(mut self, excluded: usize) -> Self {
        self.excluded_failures = excluded;
        self
    }

    pub fn with_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Size accounting for the console compression path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    pub reduction_percent: f64,
}

impl CompressionStats {
    pub fn new(original_size: usize, compressed_size: usize) -> Self {
        let reduction_percent = if original_size == 0 {
            0.0
        } else {
            (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
        };
        Self {
            original_size,
            compressed_size,
            reduction_percent,
        }
    }
}

/// Framework vocabulary of the directory detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedFramework {
    Jest,
    Pytest,
    Multiple,
    Unknown,
}

impl std::fmt::Display for DetectedFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectedFramework::Jest => write!(f, "jest"),
            DetectedFramework::Pytest => write!(f, "pytest"),
            DetectedFramework::Multiple => write!(f, "multiple"),
            DetectedFramework::Unknown => write!(f, "unknown"),
        }
    }
}

/// Detection confidence, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::None => write!(f, "none"),
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// Result of scanning a project directory for test-framework signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkDetection {
    pub framework: DetectedFramework,
    pub confidence: Confidence,
    /// Human-readable signal descriptions, in scan order
    pub detected_from: Vec<String>,
    pub recommended_command: String,
    pub notes: Option<String>,
    pub warning: Option<String>,
    /// Every framework with at least one signal (populated for `multiple`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<DetectedFramework>,
}

/// Local/global configuration for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub version: String,
    pub default_model: Option<String>,
    /// Explicit ceiling applied on top of the model limit
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default = "default_first_lines")]
    pub first_lines: usize,
    #[serde(default = "default_last_lines")]
    pub last_lines: usize,
}

fn default_first_lines() -> usize {
    crate::compressor::STRUCTURED_FIRST_LINES
}

fn default_last_lines() -> usize {
    crate::compressor::STRUCTURED_LAST_LINES
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            default_model: Some(crate::models::DEFAULT_MODEL.to_string()),
            max_tokens: None,
            first_lines: default_first_lines(),
            last_lines: default_last_lines(),
        }
    }
}

#[cfg(test)]
mod tests;
