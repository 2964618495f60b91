use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config;
use crate::error::read_input;
use crate::models::{get_all_models, get_model_limit, is_model_supported, DEFAULT_TOKEN_LIMIT};
use crate::tokens::{calculate_overage_percentage, check_token_limit};

/// Count tokens in a file and compare against a model's limit.
pub fn tokens(file: PathBuf, model: Option<String>) -> Result<()> {
    let text = read_input(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let model = model.unwrap_or_else(config::get_model);
    let limit = get_model_limit(&model);
    let check = check_token_limit(&text, limit);

    if !is_model_supported(&model) {
        let note = if limit == DEFAULT_TOKEN_LIMIT {
            format!("Unknown model '{}', using default limit", model)
        } else {
            format!("Model '{}' resolved by partial match", model)
        };
        println!("{}", note.yellow());
    }

    println!("{:<12} {}", "Model:".bright_black(), model);
    println!("{:<12} {}", "Limit:".bright_black(), limit);
    println!("{:<12} {}", "Safe limit:".bright_black(), check.safe_limit);
    println!("{:<12} {}", "Tokens:".bright_black(), check.token_count);

    if check.within_limit {
        println!("{}", "Within limit".green().bold());
    } else {
        println!(
            "{}",
            format!(
                "Over limit by {:.1}%",
                calculate_overage_percentage(check.token_count, limit)
            )
            .red()
            .bold()
        );
    }

    Ok(())
}

/// List the model limit registry.
pub fn models() -> Result<()> {
    println!(
        "{:<32} {:>10}",
        "MODEL".bright_black(),
        "TOKENS".bright_black()
    );
    println!("{}", "─".repeat(43).bright_black());
    for (model, limit) in get_all_models() {
        println!("{:<32} {:>10}", model, limit);
    }
    println!();
    println!(
        "{}",
        format!("Unknown models fall back to {} tokens", DEFAULT_TOKEN_LIMIT).bright_black()
    );
    Ok(())
}
