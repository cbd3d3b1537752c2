//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, init::InitArgs, new::NewArgs,
    run::RunArgs, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "tra")]
#[command(author, version, about = "Tessera Risk Analysis")]
#[command(long_about = "Quantitative risk analysis (Monte Carlo, FMEA, Bow-Tie, scenarios, VaR) over plain-text parameter files.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .tra/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new TRA project
    Init(InitArgs),

    /// Create a starter parameter file
    New(NewArgs),

    /// Validate parameter files against the schema
    Validate(ValidateArgs),

    /// Run an analysis from a parameter file
    Run(RunArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Styled summary for terminals
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Headline metrics as CSV (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}

impl OutputFormat {
    /// Resolve `auto` against the configured default
    pub fn resolve(self, configured: Option<&str>) -> OutputFormat {
        match self {
            OutputFormat::Auto => configured
                .and_then(|name| OutputFormat::from_str(name, true).ok())
                .unwrap_or(OutputFormat::Auto),
            other => other,
        }
    }
}
