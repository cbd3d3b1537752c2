//! `tra init` command - Initialize a new TRA project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .tra/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    // Create directory if it doesn't exist
    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Created directory {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            if global.quiet {
                return Ok(());
            }
            println!(
                "{} Initialized TRA project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Create a parameter file",
                style("tra new monte_carlo --risk-id RISK-001").yellow()
            );
            println!(
                "  {} Validate parameter files",
                style("tra validate").yellow()
            );
            println!(
                "  {} Run an analysis",
                style("tra run analyses/risk-001-monte_carlo.tra.yaml").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} TRA project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("tra init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [".tra/", ".tra/config.yaml", "analyses/"];

    for entry in entries {
        if root.join(entry).exists() {
            let prefix = if entry.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(entry).dim());
        }
    }
}
