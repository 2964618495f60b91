use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config;
use crate::digest::{digest_file, Budget, Digest};
use crate::types::Framework;

/// Parse a report or log file and print the digest.
pub fn run(
    file: PathBuf,
    framework: Option<String>,
    model: Option<String>,
    max_tokens: Option<usize>,
    json: bool,
) -> Result<()> {
    let declared = parse_framework(framework.as_deref())?;
    let settings = config::load_config();
    let budget = Budget::for_model(model.unwrap_or_else(config::get_model))
        .with_max_tokens(max_tokens.or(settings.max_tokens));

    let digest = digest_file(&file, declared, Some(&budget));

    if json {
        let out = serde_json::to_string_pretty(&digest).context("Failed to serialize digest")?;
        println!("{}", out);
        return Ok(());
    }

    print_digest(&digest, &budget);

    if let Some(error) = &digest.result.error {
        bail!("{}", error);
    }
    Ok(())
}

/// `None` lets the parser sniff the format.
pub fn parse_framework(raw: Option<&str>) -> Result<Option<Framework>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let framework: Framework = raw
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("Invalid --framework value")?;
    Ok(match framework {
        Framework::Unknown => None,
        other => Some(other),
    })
}

fn print_digest(digest: &Digest, budget: &Budget) {
    let result = &digest.result;
    let mut lines = digest.summary.lines();

    if let Some(header) = lines.next() {
        if result.error.is_some() || result.failed_tests > 0 {
            println!("{}", header.red().bold());
        } else {
            println!("{}", header.green().bold());
        }
    }

    for line in lines {
        if line.starts_with("Warning:") {
            println!("{}", line.yellow());
        } else if line.starts_with("Error:") {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }

    if let Some(stats) = &digest.stats {
        println!(
            "{}",
            format!(
                "Console output compressed {} -> {} bytes ({:.1}% smaller)",
                stats.original_size, stats.compressed_size, stats.reduction_percent
            )
            .bright_black()
        );
    }

    if let Some(check) = &digest.budget {
        let line = format!(
            "Tokens: {} / {} safe limit ({})",
            check.token_count, check.safe_limit, budget.model_id
        );
        if !check.within_limit {
            println!("{}", line.red());
        } else if check.dropped_records > 0 {
            println!("{}", line.yellow());
        } else {
            println!("{}", line.bright_black());
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_parse_framework() {
        assert_eq!(parse_framework(None).unwrap(), None);
        assert_eq!(parse_framework(Some("auto")).unwrap(), None);
        assert_eq!(parse_framework(Some("jest")).unwrap(), Some(Framework::Jest));
        assert_eq!(parse_framework(Some("text")).unwrap(), Some(Framework::Console));
        assert!(parse_framework(Some("mocha")).is_err());
    }
}
