//! `tra run` command - Run an analysis from a parameter file

use console::style;
use miette::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::helpers::{find_project, write_output};
use crate::cli::output;
use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::engine::{
    AnalysisOrchestrator, AnalysisRequest, Methodology, MonteCarloEngine, RunControl,
};
use crate::schema::{SchemaRegistry, Validator};
use crate::yaml::parse_yaml_str;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Parameter file (*.tra.yaml)
    pub file: PathBuf,

    /// Override the methodology in the file
    #[arg(long, short = 'm')]
    pub methodology: Option<Methodology>,

    /// Seed for every random draw (overrides file and config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the Monte Carlo iteration count
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Abort after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Run the simulation on a single thread
    #[arg(long)]
    pub no_parallel: bool,

    /// Write the record to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let project = find_project(global);
    let config = Config::load_for(project.as_ref());

    let content = std::fs::read_to_string(&args.file)
        .map_err(|e| miette::miette!("cannot read {}: {}", args.file.display(), e))?;
    let filename = args.file.display().to_string();

    let validator = Validator::new(&SchemaRegistry::default())?;
    validator.validate(&content, &filename)?;
    let mut request: AnalysisRequest = parse_yaml_str(&content, &filename)?;

    apply_overrides(&mut request, &args, &config, global.quiet);

    let mut control = RunControl::new();
    if let Some(limit) = args.timeout.map(Duration::from_secs).or_else(|| config.timeout()) {
        control = control.with_timeout(limit);
    }
    let parallel = !args.no_parallel && config.parallel();
    let orchestrator =
        AnalysisOrchestrator::new().with_engine(MonteCarloEngine::new().with_parallel(parallel));

    tracing::debug!(
        file = %filename,
        methodology = %request.methodology,
        parallel,
        "running analysis"
    );
    let record = orchestrator.run(&request, &control)?;

    let format = global.format.resolve(config.default_format.as_deref());
    let rendered = output::render(&record, format)?;
    write_output(&rendered, args.output.as_deref(), global.quiet)?;

    let failed = record.failures().count();
    if failed > 0 && !global.quiet {
        eprintln!(
            "{} {} of {} evaluator(s) failed; see the record for details",
            style("!").yellow(),
            failed,
            record.calculation_results.len()
        );
    }

    Ok(())
}

/// Flags beat the file, the file beats configuration
fn apply_overrides(request: &mut AnalysisRequest, args: &RunArgs, config: &Config, quiet: bool) {
    if let Some(methodology) = args.methodology {
        request.methodology = methodology;
    }

    request.seed = args.seed.or(request.seed).or(config.seed);

    if let Some(iterations) = args.iterations {
        match request.monte_carlo.as_mut() {
            Some(params) => params.iterations = iterations,
            None if !quiet => eprintln!(
                "{} --iterations ignored: {} has no monte_carlo section",
                style("!").yellow(),
                args.file.display()
            ),
            None => {}
        }
    }
}
