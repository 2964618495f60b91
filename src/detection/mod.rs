//! Advisory test-framework detection for a project directory.
//!
//! Only the top level of the directory is listed; manifests and config files
//! named by the detectors are read from there. Detection never fails: an
//! unreadable directory is reported the same way as an empty one.

mod detectors;

use std::path::Path;

use tracing::debug;

use crate::types::{Confidence, DetectedFramework, FrameworkDetection};

pub use detectors::{
    has_pytest_json_plugin, jest_signals, pytest_signals, ProjectScan, Signal, PYTEST_JSON_PLUGIN,
};

/// Directory (relative to the project) that recommended commands write into.
/// `testdigest init` creates it.
pub const OUTPUT_DIR: &str = ".testdigest";

/// Frameworks with detectors, in reporting order.
const FRAMEWORKS: &[DetectedFramework] = &[DetectedFramework::Jest, DetectedFramework::Pytest];

pub const JEST_COMMAND: &str = "npx jest --json --outputFile=.testdigest/jest-results.json";
pub const PYTEST_JSON_COMMAND: &str =
    "pytest --json-report --json-report-file=.testdigest/pytest-results.json";
pub const PYTEST_CONSOLE_COMMAND: &str =
    "pytest -rA --tb=short 2>&1 | tee .testdigest/pytest-output.txt";
pub const GENERIC_NODE_COMMAND: &str = "npm test 2>&1 | tee .testdigest/test-output.txt";
pub const GENERIC_PYTHON_COMMAND: &str =
    "python -m pytest -rA --tb=short 2>&1 | tee .testdigest/test-output.txt";

const LOW_CONFIDENCE_NOTE: &str =
    "Detected from weak signals only; verify the framework before relying on this command";
const MANUAL_CONFIGURATION_NOTE: &str =
    "No test framework detected. Run your tests manually and pass the output file to `testdigest parse`";

/// Scan `dir` and recommend a framework, confidence, and output command.
pub fn detect_framework(dir: &Path) -> FrameworkDetection {
    let Some(scan) = ProjectScan::new(dir) else {
        debug!(dir = %dir.display(), "directory not readable, nothing detected");
        return unknown();
    };

    let signals: Vec<Signal> = jest_signals(&scan)
        .into_iter()
        .chain(pytest_signals(&scan))
        .collect();

    let found: Vec<(DetectedFramework, Vec<Signal>)> = FRAMEWORKS
        .iter()
        .map(|framework| {
            let own: Vec<Signal> = signals
                .iter()
                .filter(|signal| signal.framework == *framework)
                .cloned()
                .collect();
            (*framework, own)
        })
        .filter(|(_, own)| !own.is_empty())
        .collect();

    for (framework, signals) in &found {
        debug!(%framework, count = signals.len(), "framework signals found");
    }

    match found.len() {
        0 => unknown(),
        1 => {
            let (framework, signals) = &found[0];
            single(*framework, signals, &scan)
        }
        _ => multiple(&found, &scan),
    }
}

fn strongest(signals: &[Signal]) -> Confidence {
    signals
        .iter()
        .map(|s| s.confidence)
        .max()
        .unwrap_or(Confidence::None)
}

fn sources(signals: &[Signal]) -> Vec<String> {
    signals.iter().map(|s| s.source.clone()).collect()
}

fn single(framework: DetectedFramework, signals: &[Signal], scan: &ProjectScan) -> FrameworkDetection {
    let confidence = strongest(signals);
    let (command, mut notes) = command_for(framework, confidence, scan);

    if confidence == Confidence::Low {
        notes = Some(match notes {
            Some(existing) => format!("{LOW_CONFIDENCE_NOTE}. {existing}"),
            None => LOW_CONFIDENCE_NOTE.to_string(),
        });
    }

    FrameworkDetection {
        framework,
        confidence,
        detected_from: sources(signals),
        recommended_command: command,
        notes,
        warning: None,
        candidates: vec![framework],
    }
}

fn multiple(found: &[(DetectedFramework, Vec<Signal>)], scan: &ProjectScan) -> FrameworkDetection {
    let candidates: Vec<DetectedFramework> = found.iter().map(|(fw, _)| *fw).collect();
    let confidence = found
        .iter()
        .map(|(_, signals)| strongest(signals))
        .min()
        .unwrap_or(Confidence::None);

    let options: Vec<String> = found
        .iter()
        .map(|(framework, signals)| {
            let (command, _) = command_for(*framework, strongest(signals), scan);
            format!("{framework}: {command}")
        })
        .collect();

    let names: Vec<String> = candidates.iter().map(ToString::to_string).collect();

    FrameworkDetection {
        framework: DetectedFramework::Multiple,
        confidence,
        detected_from: found.iter().flat_map(|(_, signals)| sources(signals)).collect(),
        recommended_command: String::new(),
        notes: Some(format!("Run one of:\n{}", options.join("\n"))),
        warning: Some(format!(
            "Multiple test frameworks detected ({}); choose one explicitly",
            names.join(", ")
        )),
        candidates,
    }
}

fn unknown() -> FrameworkDetection {
    FrameworkDetection {
        framework: DetectedFramework::Unknown,
        confidence: Confidence::None,
        detected_from: Vec::new(),
        recommended_command: String::new(),
        notes: Some(format!(
            "{MANUAL_CONFIGURATION_NOTE}. Options:\n{GENERIC_NODE_COMMAND}\n{GENERIC_PYTHON_COMMAND}"
        )),
        warning: None,
        candidates: Vec::new(),
    }
}

/// Richest output mode the framework supports; weak evidence gets the
/// runner-agnostic command instead.
fn command_for(
    framework: DetectedFramework,
    confidence: Confidence,
    scan: &ProjectScan,
) -> (String, Option<String>) {
    match (framework, confidence) {
        (DetectedFramework::Jest, Confidence::Low) => (GENERIC_NODE_COMMAND.to_string(), None),
        (DetectedFramework::Jest, _) => (JEST_COMMAND.to_string(), None),
        (DetectedFramework::Pytest, Confidence::Low) => (GENERIC_PYTHON_COMMAND.to_string(), None),
        (DetectedFramework::Pytest, _) if has_pytest_json_plugin(scan) => {
            (PYTEST_JSON_COMMAND.to_string(), None)
        }
        (DetectedFramework::Pytest, _) => (
            PYTEST_CONSOLE_COMMAND.to_string(),
            Some(format!(
                "Install {PYTEST_JSON_PLUGIN} for structured output: {PYTEST_JSON_COMMAND}"
            )),
        ),
        (DetectedFramework::Multiple | DetectedFramework::Unknown, _) => (String::new(), None),
    }
}
