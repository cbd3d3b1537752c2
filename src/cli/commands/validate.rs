//! `tra validate` command - Validate parameter files against the schema

use console::style;
use miette::Result;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::cli::helpers::require_project;
use crate::cli::GlobalOpts;
use crate::core::project::is_parameter_file;
use crate::engine::AnalysisRequest;
use crate::schema::registry::SchemaRegistry;
use crate::schema::validator::Validator;
use crate::yaml::parse_yaml_str;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Files or directories to validate (default: entire project)
    #[arg()]
    pub paths: Vec<PathBuf>,

    /// Continue validation after first error
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let validator = Validator::new(&SchemaRegistry::default())?;

    let files_to_validate: Vec<PathBuf> = if args.paths.is_empty() {
        let project = require_project(global)?;
        let mut files: Vec<PathBuf> = project.iter_parameter_files().collect();
        files.sort();
        files
    } else {
        expand_paths(&args.paths)
    };

    let verbose = !args.summary && !global.quiet;
    let mut stats = ValidationStats::default();

    if verbose {
        println!(
            "{} Validating {} file(s)...\n",
            style("→").blue(),
            files_to_validate.len()
        );
    }

    for path in &files_to_validate {
        stats.files_checked += 1;

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                if verbose {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
                stats.files_failed += 1;
                stats.total_errors += 1;
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        let filename = path.display().to_string();

        // Schema first, then the checks a schema cannot express
        let errors = match validator.validate(&content, &filename) {
            Err(e) => {
                let count = e.violation_count();
                if verbose {
                    println!(
                        "{} {} - {} error(s)",
                        style("✗").red(),
                        path.display(),
                        count
                    );
                    println!("{:?}", miette::Report::new(e));
                }
                count
            }
            Ok(()) => match parse_yaml_str::<AnalysisRequest>(&content, &filename) {
                Err(e) => {
                    if verbose {
                        println!("{} {} - 1 error(s)", style("✗").red(), path.display());
                        println!("{:?}", miette::Report::new(e));
                    }
                    1
                }
                Ok(request) => {
                    let failures = request.check_inputs();
                    if verbose {
                        if failures.is_empty() {
                            println!("{} {}", style("✓").green(), path.display());
                        } else {
                            println!(
                                "{} {} - {} error(s)",
                                style("✗").red(),
                                path.display(),
                                failures.len()
                            );
                            for failure in &failures {
                                println!(
                                    "    {} {}",
                                    style(format!("{}:", failure.evaluator)).red(),
                                    failure.message
                                );
                            }
                        }
                    }
                    failures.len()
                }
            },
        };

        if errors == 0 {
            stats.files_passed += 1;
        } else {
            stats.files_failed += 1;
            stats.total_errors += errors;
            if !args.keep_going {
                break;
            }
        }
    }

    if !global.quiet {
        println!();
        println!("{}", style("─".repeat(60)).dim());
        println!("{}", style("Validation Summary").bold());
        println!("{}", style("─".repeat(60)).dim());
        println!("  Files checked:  {}", style(stats.files_checked).cyan());
        println!("  Files passed:   {}", style(stats.files_passed).green());
        println!("  Files failed:   {}", style(stats.files_failed).red());
        println!("  Total errors:   {}", style(stats.total_errors).red());
        println!();
    }

    if stats.files_failed > 0 {
        if stats.files_failed == 1 {
            Err(miette::miette!("Validation failed: 1 file has errors"))
        } else {
            Err(miette::miette!(
                "Validation failed: {} files have errors",
                stats.files_failed
            ))
        }
    } else {
        if !global.quiet {
            println!(
                "{} All files passed validation!",
                style("✓").green().bold()
            );
        }
        Ok(())
    }
}

/// Expand directories into the parameter files they contain
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path().to_path_buf())
                .filter(|p| is_parameter_file(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }

    files
}
