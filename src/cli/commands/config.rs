//! `tra config` command - Configuration management
//!
//! Provides commands to view and modify TRA configuration.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::helpers::{find_project, require_project};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., author, seed)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("author", "Author recorded in generated parameter files"),
    ("default_format", "Output format when --format is auto (yaml, json, csv, md)"),
    ("seed", "Fixed seed for every run"),
    ("parallel", "Run Monte Carlo chunks on all cores (true/false)"),
    ("timeout_secs", "Abort analyses running longer than this"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = find_project(global);
    let config = Config::load_for(project.as_ref());

    if let Some(key) = &args.key {
        check_key(key)?;
        return match get_config_value(&config, key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&config).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&config).into_diagnostic()?;
            print!("{}", yaml);
        }
        _ => {
            println!("{}", style("Effective Configuration").bold().underlined());
            println!();
            for (key, _) in VALID_KEYS {
                print_config_value(key, get_config_value(&config, key).as_deref());
            }

            println!();
            println!("{}", style("Config Sources (in priority order):").dim());
            println!("  1. Command-line flags");
            println!("  2. Environment variables (TRA_AUTHOR, TRA_FORMAT, TRA_SEED, TRA_PARALLEL, TRA_TIMEOUT_SECS)");
            println!("  3. Project config (.tra/config.yaml)");
            println!("  4. Global config (~/.config/tra/config.yaml)");
        }
    }

    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let value = typed_value(&args.key, &args.value)?;
    let config_path = config_path(args.global, global)?;

    let mut config_map = read_mapping(&config_path)?;
    config_map.insert(serde_yml::Value::String(args.key.clone()), value);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = config_path(args.global, global)?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    if config_map
        .remove(serde_yml::Value::String(args.key.clone()))
        .is_none()
    {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = global_config_path()?;

    println!("{}", style("Configuration file paths:").bold());
    println!();
    println!("  {} {}", style("Global:").cyan(), global_path.display());
    print_exists(global_path.exists(), 9);

    println!();
    match find_project(global) {
        Some(project) => {
            let path = project.tra_dir().join("config.yaml");
            println!("  {} {}", style("Project:").cyan(), path.display());
            print_exists(path.exists(), 10);
        }
        None => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in a TRA project)").dim()
        ),
    }

    Ok(())
}

fn print_exists(exists: bool, indent: usize) {
    let note = if exists {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("{}{}", " ".repeat(indent), note);
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'tra config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

// Helper functions

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            "Unknown config key '{}'. Run 'tra config keys' for the list",
            key
        ))
    }
}

/// Parse `raw` into the YAML type `key` is stored as
fn typed_value(key: &str, raw: &str) -> Result<serde_yml::Value> {
    let value = match key {
        "seed" | "timeout_secs" => {
            let n: u64 = raw
                .trim()
                .parse()
                .map_err(|_| miette::miette!("'{}' must be a non-negative integer", key))?;
            serde_yml::Value::Number(n.into())
        }
        "parallel" => {
            let b: bool = raw
                .trim()
                .parse()
                .map_err(|_| miette::miette!("'parallel' must be true or false"))?;
            serde_yml::Value::Bool(b)
        }
        "default_format" => {
            <OutputFormat as clap::ValueEnum>::from_str(raw, true)
                .map_err(|_| miette::miette!("Unknown format '{}'", raw))?;
            serde_yml::Value::String(raw.to_lowercase())
        }
        _ => serde_yml::Value::String(raw.to_string()),
    };
    Ok(value)
}

fn read_mapping(path: &Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content) {
        Ok(serde_yml::Value::Mapping(map)) => Ok(map),
        Ok(_) => Ok(serde_yml::Mapping::new()),
        Err(e) => Err(miette::miette!("{} is not valid YAML: {}", path.display(), e)),
    }
}

fn config_path(global_scope: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if global_scope {
        global_config_path()
    } else {
        Ok(require_project(global)?.tra_dir().join("config.yaml"))
    }
}

fn global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "author" => config.author.clone(),
        "default_format" => config.default_format.clone(),
        "seed" => config.seed.map(|v| v.to_string()),
        "parallel" => config.parallel.map(|v| v.to_string()),
        "timeout_secs" => config.timeout_secs.map(|v| v.to_string()),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}
