//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::Project;

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Two decimals with thousands separators, e.g. 1234567.891 -> "1,234,567.89"
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Undefined metrics print as "n/a"
pub fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt_num).unwrap_or_else(|| "n/a".to_string())
}

pub fn fmt_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Print to stdout, or write to `output_path` and say so unless quiet
pub fn write_output(content: &str, output_path: Option<&Path>, quiet: bool) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            if !quiet {
                eprintln!(
                    "{} Written to {}",
                    style("✓").green(),
                    style(path.display()).cyan()
                );
            }
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}

/// Project from `--project`, else discovered from the working directory
pub fn find_project(global: &GlobalOpts) -> Option<Project> {
    match &global.project {
        Some(root) => Project::discover_from(root).ok(),
        None => Project::discover().ok(),
    }
}

/// Like [`find_project`], but a missing project is an error
pub fn require_project(global: &GlobalOpts) -> Result<Project> {
    let found = match &global.project {
        Some(root) => Project::discover_from(root),
        None => Project::discover(),
    };
    found.map_err(|e| miette::miette!("{}", e))
}
