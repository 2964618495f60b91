use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::{local_config_path, save_local_config};
use crate::detection::detect_framework;
use crate::types::DigestConfig;

/// Create `.testdigest/` with a local config in the current directory.
pub fn run(model: Option<String>, max_tokens: Option<usize>, force: bool) -> Result<()> {
    let root = Path::new(".");
    let path = local_config_path(root);

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let defaults = DigestConfig::default();
    let config = DigestConfig {
        default_model: model.or(defaults.default_model.clone()),
        max_tokens,
        ..defaults
    };

    let written = save_local_config(root, &config).context("Failed to write local config")?;
    println!("{} {}", "Created".green().bold(), written.display());

    let detection = detect_framework(root);
    if !detection.recommended_command.is_empty() {
        println!(
            "Run {} then {}",
            detection.recommended_command.cyan(),
            "testdigest parse <output file>".cyan()
        );
    } else {
        println!("Run {} to see framework options", "testdigest detect".cyan());
    }

    Ok(())
}
