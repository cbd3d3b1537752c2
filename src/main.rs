use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tra::cli::{Cli, Commands, GlobalOpts};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(&global);

    match cli.command {
        Commands::Init(args) => tra::cli::commands::init::run(args, &global),
        Commands::New(args) => tra::cli::commands::new::run(args, &global),
        Commands::Validate(args) => tra::cli::commands::validate::run(args, &global),
        Commands::Run(args) => tra::cli::commands::run::run(args, &global),
        Commands::Config(cmd) => tra::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => tra::cli::commands::completions::run(args),
    }
}

/// Diagnostics go to stderr so stdout stays pipeable; RUST_LOG wins over flags
fn init_tracing(global: &GlobalOpts) {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
