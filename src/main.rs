//! chatlens - CLI entry point

mod commands;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches};

use chatlens::cli::{build_cli_styles, Cli, Commands, ConfigCommands};
use chatlens::PipelineError;

/// Exit code after an interrupted run (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[cfg(not(tarpaulin_include))]
fn main() {
    let matches = Cli::command().styles(build_cli_styles()).get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: {e:#}");
    }

    if let Err(error) = run(cli) {
        if let Some(PipelineError::Cancelled { .. }) = error.downcast_ref::<PipelineError>() {
            eprintln!("{error}");
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

#[cfg(not(tarpaulin_include))]
fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => commands::analyze::handle(&args),
        Commands::Sessions {
            chat_file,
            time_threshold,
        } => commands::sessions::handle(&chat_file, time_threshold),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::handle_show(),
            ConfigCommands::Path => commands::config::handle_path(),
        },
    }
}

/// Log to stderr at `warn` (or `debug` with --verbose); RUST_LOG wins.
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
