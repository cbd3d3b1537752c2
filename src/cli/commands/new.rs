//! `tra new` command - Create a starter parameter file

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::find_project;
use crate::cli::GlobalOpts;
use crate::core::project::PARAMETER_FILE_SUFFIX;
use crate::core::Config;
use crate::engine::sampler::DistributionKind;
use crate::engine::Methodology;
use crate::schema::{SchemaWizard, TemplateContext, TemplateGenerator};

const DEFAULT_RISK_ID: &str = "RISK-001";

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Methodology (monte_carlo, fmea, bow_tie, scenario, value_at_risk, comprehensive)
    pub methodology: Option<Methodology>,

    /// Identifier of the risk being analysed
    #[arg(long, short = 'r')]
    pub risk_id: Option<String>,

    /// Fix the seed in the generated file
    #[arg(long)]
    pub seed: Option<u64>,

    /// Monte Carlo iterations
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Probability distribution for the simulation
    #[arg(long, short = 'd')]
    pub distribution: Option<DistributionKind>,

    /// Output path (default: analyses/<risk>-<methodology>.tra.yaml)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the file instead of writing it
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,

    /// Use interactive wizard to fill in fields
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

pub fn run(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = find_project(global);
    let config = Config::load_for(project.as_ref());

    let ctx = if args.interactive {
        let wizard = SchemaWizard::new()?;
        wizard.run(args.methodology)?.into_context(config.author())
    } else {
        let methodology = args.methodology.ok_or_else(|| {
            miette::miette!(
                "Missing methodology. Use one of: {} (or -i for the wizard)",
                Methodology::all()
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        let risk_id = args.risk_id.clone().unwrap_or_else(|| DEFAULT_RISK_ID.to_string());
        let mut ctx = TemplateContext::new(methodology, risk_id, config.author());
        if let Some(seed) = args.seed {
            ctx = ctx.with_seed(seed);
        }
        if let Some(iterations) = args.iterations {
            ctx = ctx.with_iterations(iterations);
        }
        if let Some(distribution) = args.distribution {
            ctx = ctx.with_distribution(distribution);
        }
        ctx
    };

    let generator = TemplateGenerator::new().map_err(|e| miette::miette!("{}", e))?;
    let yaml_content = generator
        .generate(&ctx)
        .map_err(|e| miette::miette!("{}", e))?;

    if args.stdout {
        print!("{}", yaml_content);
        return Ok(());
    }

    let file_path = match (&args.output, &project) {
        (Some(path), _) => path.clone(),
        (None, Some(project)) => project.parameter_path(ctx.methodology, &ctx.risk_id),
        (None, None) => PathBuf::from(format!(
            "{}-{}{}",
            ctx.risk_id.to_lowercase(),
            ctx.methodology.as_str(),
            PARAMETER_FILE_SUFFIX
        )),
    };

    if file_path.exists() && !args.force {
        return Err(miette::miette!(
            "{} already exists (use --force to overwrite)",
            file_path.display()
        ));
    }

    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }
    }
    fs::write(&file_path, &yaml_content).into_diagnostic()?;
    tracing::debug!(path = %file_path.display(), methodology = %ctx.methodology, "wrote parameter file");

    if !global.quiet {
        println!(
            "{} Created {} parameter file for {}",
            style("✓").green(),
            style(ctx.methodology.as_str()).cyan(),
            style(&ctx.risk_id).yellow()
        );
        println!("   {}", style(file_path.display()).dim());
        println!();
        println!(
            "Edit the values, then run {}",
            style(format!("tra run {}", file_path.display())).yellow()
        );
    }

    Ok(())
}
