use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::compressor::compress_stack_trace;
use crate::config;
use crate::error::read_input;

/// Head/tail-compress a stack trace file to stdout.
pub fn run(file: PathBuf, first: Option<usize>, last: Option<usize>) -> Result<()> {
    let text = read_input(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let settings = config::load_config();
    let first = first.unwrap_or(settings.first_lines);
    let last = last.unwrap_or(settings.last_lines);

    println!("{}", compress_stack_trace(&text, first, last));
    Ok(())
}
