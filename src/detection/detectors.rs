use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::types::{Confidence, DetectedFramework};

/// One piece of evidence for a framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub framework: DetectedFramework,
    pub confidence: Confidence,
    pub source: String,
}

impl Signal {
    fn new(framework: DetectedFramework, confidence: Confidence, source: impl Into<String>) -> Self {
        Self {
            framework,
            confidence,
            source: source.into(),
        }
    }
}

/// Directory listing plus the manifests every detector reads. Built once per scan.
pub struct ProjectScan<'a> {
    pub dir: &'a Path,
    pub entries: HashSet<String>,
    package_json: Option<Value>,
    pyproject: Option<toml::Value>,
    requirements: Vec<(String, String)>,
}

const REQUIREMENTS_FILES: &[&str] = &[
    "requirements.txt",
    "requirements-dev.txt",
    "requirements-test.txt",
    "dev-requirements.txt",
    "test-requirements.txt",
];

impl<'a> ProjectScan<'a> {
    /// Scan `dir` once. Returns `None` when the directory cannot be listed.
    pub fn new(dir: &'a Path) -> Option<Self> {
        let entries: HashSet<String> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();

        let package_json = read_if_present(dir, &entries, "package.json").and_then(|text| {
            serde_json::from_str(&text)
                .map_err(|err| debug!(error = %err, "ignoring unparseable package.json"))
                .ok()
        });
        let pyproject = read_if_present(dir, &entries, "pyproject.toml").and_then(|text| {
            toml::from_str(&text)
                .map_err(|err| debug!(error = %err, "ignoring unparseable pyproject.toml"))
                .ok()
        });
        let requirements = REQUIREMENTS_FILES
            .iter()
            .filter_map(|name| read_if_present(dir, &entries, name).map(|t| (name.to_string(), t)))
            .collect();

        Some(Self {
            dir,
            entries,
            package_json,
            pyproject,
            requirements,
        })
    }

    fn has(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    fn read(&self, name: &str) -> Option<String> {
        read_if_present(self.dir, &self.entries, name)
    }
}

fn read_if_present(dir: &Path, entries: &HashSet<String>, name: &str) -> Option<String> {
    if !entries.contains(name) {
        return None;
    }
    fs::read_to_string(dir.join(name)).ok()
}

// ── Jest ────────────────────────────────────────────────────────────────────

const JEST_CONFIG_FILES: &[&str] = &[
    "jest.config.js",
    "jest.config.ts",
    "jest.config.mjs",
    "jest.config.cjs",
    "jest.config.json",
];

const JS_TEST_SUFFIXES: &[&str] = &[
    ".test.js", ".test.ts", ".test.jsx", ".test.tsx", ".spec.js", ".spec.ts",
];

pub fn jest_signals(scan: &ProjectScan) -> Vec<Signal> {
    let mut signals = Vec::new();
    let jest = |confidence, source: String| Signal::new(DetectedFramework::Jest, confidence, source);

    if let Some(package) = &scan.package_json {
        for section in ["dependencies", "devDependencies"] {
            if package.get(section).and_then(|deps| deps.get("jest")).is_some() {
                signals.push(jest(Confidence::High, format!("package.json {section}: jest")));
            }
        }
        if package.get("jest").is_some() {
            signals.push(jest(Confidence::High, "package.json \"jest\" config".to_string()));
        }
        let test_script = package
            .get("scripts")
            .and_then(|scripts| scripts.get("test"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if test_script.split_whitespace().any(|word| word == "jest") {
            signals.push(jest(Confidence::High, "package.json scripts.test runs jest".to_string()));
        }
    }

    for config in JEST_CONFIG_FILES {
        if scan.has(config) {
            signals.push(jest(Confidence::Medium, config.to_string()));
        }
    }

    if scan.has("__tests__") && scan.dir.join("__tests__").is_dir() {
        signals.push(jest(Confidence::Low, "__tests__/ directory".to_string()));
    }
    if let Some(file) = first_matching(&scan.entries, |name| {
        JS_TEST_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
    }) {
        signals.push(jest(Confidence::Low, format!("test file {file}")));
    }

    signals
}

// ── pytest ──────────────────────────────────────────────────────────────────

pub const PYTEST_JSON_PLUGIN: &str = "pytest-json-report";

pub fn pytest_signals(scan: &ProjectScan) -> Vec<Signal> {
    let mut signals = Vec::new();
    let pytest =
        |confidence, source: String| Signal::new(DetectedFramework::Pytest, confidence, source);

    if let Some(pyproject) = &scan.pyproject {
        let has_ini_options = pyproject
            .get("tool")
            .and_then(|tool| tool.get("pytest"))
            .and_then(|pt| pt.get("ini_options"))
            .is_some();
        if has_ini_options {
            signals.push(pytest(
                Confidence::High,
                "pyproject.toml [tool.pytest.ini_options]".to_string(),
            ));
        }
        if pyproject_requirements(pyproject).iter().any(|r| requirement_name(r) == "pytest") {
            signals.push(pytest(Confidence::High, "pyproject.toml dependency: pytest".to_string()));
        }
    }

    for (file, text) in &scan.requirements {
        if text.lines().any(|line| requirement_name(line) == "pytest") {
            signals.push(pytest(Confidence::High, format!("{file}: pytest")));
        }
    }

    if scan.has("pytest.ini") {
        signals.push(pytest(Confidence::Medium, "pytest.ini".to_string()));
    }
    if scan.has("conftest.py") {
        signals.push(pytest(Confidence::Medium, "conftest.py".to_string()));
    }
    if scan.read("tox.ini").is_some_and(|text| text.contains("[pytest]")) {
        signals.push(pytest(Confidence::Medium, "tox.ini [pytest]".to_string()));
    }
    if scan.read("setup.cfg").is_some_and(|text| text.contains("[tool:pytest]")) {
        signals.push(pytest(Confidence::Medium, "setup.cfg [tool:pytest]".to_string()));
    }

    if let Some(file) = first_matching(&scan.entries, |name| {
        name.ends_with(".py") && (name.starts_with("test_") || name.ends_with("_test.py"))
    }) {
        signals.push(pytest(Confidence::Low, format!("test file {file}")));
    }

    signals
}

/// Whether the JSON report plugin is declared anywhere pytest is.
pub fn has_pytest_json_plugin(scan: &ProjectScan) -> bool {
    let in_pyproject = scan
        .pyproject
        .as_ref()
        .is_some_and(|p| pyproject_requirements(p).iter().any(|r| requirement_name(r) == PYTEST_JSON_PLUGIN));
    let in_requirements = scan
        .requirements
        .iter()
        .any(|(_, text)| text.lines().any(|line| requirement_name(line) == PYTEST_JSON_PLUGIN));
    in_pyproject || in_requirements
}

/// Every requirement string or dependency name declared in pyproject.toml:
/// PEP 621 `project.dependencies` / `optional-dependencies`, PEP 735
/// `dependency-groups`, and Poetry dependency tables.
fn pyproject_requirements(pyproject: &toml::Value) -> Vec<String> {
    let mut found = Vec::new();
    let mut push_array = |value: Option<&toml::Value>| {
        if let Some(items) = value.and_then(toml::Value::as_array) {
            found.extend(items.iter().filter_map(toml::Value::as_str).map(str::to_string));
        }
    };

    let project = pyproject.get("project");
    push_array(project.and_then(|p| p.get("dependencies")));
    if let Some(extras) = project
        .and_then(|p| p.get("optional-dependencies"))
        .and_then(toml::Value::as_table)
    {
        for group in extras.values() {
            push_array(Some(group));
        }
    }
    if let Some(groups) = pyproject.get("dependency-groups").and_then(toml::Value::as_table) {
        for group in groups.values() {
            push_array(Some(group));
        }
    }

    let poetry = pyproject.get("tool").and_then(|t| t.get("poetry"));
    let mut tables: Vec<&toml::Value> = Vec::new();
    for key in ["dependencies", "dev-dependencies"] {
        if let Some(table) = poetry.and_then(|p| p.get(key)) {
            tables.push(table);
        }
    }
    if let Some(groups) = poetry.and_then(|p| p.get("group")).and_then(toml::Value::as_table) {
        tables.extend(groups.values().filter_map(|g| g.get("dependencies")));
    }
    for table in tables {
        if let Some(table) = table.as_table() {
            found.extend(table.keys().cloned());
        }
    }

    found
}

/// Normalized distribution name of a requirement line (`pytest>=7.0` -> `pytest`).
fn requirement_name(requirement: &str) -> String {
    requirement
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect::<String>()
        .to_lowercase()
        .replace('_', "-")
}

fn first_matching(entries: &HashSet<String>, pred: impl Fn(&str) -> bool) -> Option<String> {
    let mut matches: Vec<&String> = entries.iter().filter(|name| pred(name)).collect();
    matches.sort();
    matches.first().map(|name| name.to_string())
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_requirement_name() {
        assert_eq!(requirement_name("pytest>=7.0"), "pytest");
        assert_eq!(requirement_name("  pytest "), "pytest");
        assert_eq!(requirement_name("pytest-cov==4.1"), "pytest-cov");
        assert_eq!(requirement_name("pytest_json_report"), "pytest-json-report");
        assert_eq!(requirement_name("# comment"), "");
    }

    #[test]
    fn test_pyproject_requirements_sources() {
        let pyproject: toml::Value = toml::from_str(
            r#"
[project]
dependencies = ["requests>=2"]

[project.optional-dependencies]
test = ["pytest>=8"]

[tool.poetry.group.dev.dependencies]
pytest-json-report = "^1.5"
"#,
        )
        .unwrap();
        let found = pyproject_requirements(&pyproject);
        assert!(found.contains(&"requests>=2".to_string()));
        assert!(found.contains(&"pytest>=8".to_string()));
        assert!(found.contains(&"pytest-json-report".to_string()));
    }
}
