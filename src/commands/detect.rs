use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::detection::detect_framework;
use crate::types::Confidence;

pub fn run(dir: Option<PathBuf>, json: bool) -> Result<()> {
    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
    let detection = detect_framework(&dir);

    if json {
        let out =
            serde_json::to_string_pretty(&detection).context("Failed to serialize detection")?;
        println!("{}", out);
        return Ok(());
    }

    let confidence = match detection.confidence {
        Confidence::High => "high".green().bold(),
        Confidence::Medium => "medium".yellow(),
        Confidence::Low => "low".red(),
        Confidence::None => "none".bright_black(),
    };
    println!(
        "{} {} ({} confidence)",
        "Framework:".bold(),
        detection.framework,
        confidence
    );

    if !detection.detected_from.is_empty() {
        println!("{}", "Detected from:".bright_black());
        for source in &detection.detected_from {
            println!("  - {}", source);
        }
    }

    if !detection.recommended_command.is_empty() {
        println!("{} {}", "Run:".bold(), detection.recommended_command.cyan());
    }
    if let Some(warning) = &detection.warning {
        println!("{}", warning.yellow());
    }
    if let Some(notes) = &detection.notes {
        println!("{}", notes);
    }

    Ok(())
}
