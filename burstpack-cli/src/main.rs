//! Burstpack CLI - drive compressor stage runs and inspect burst stores.

mod commands;
mod producer;

use anyhow::Result;
use clap::{Parser, Subcommand};
use burstpack_executor::observability::{init_tracing, LogFormat, TracingConfig, TracingGuard};
use commands::{run::RunArgs, StageArgs};
use std::path::PathBuf;

/// Burstpack - burst-aligned compaction of multi-lane producer output.
#[derive(Parser)]
#[command(name = "burstpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic producer through a stage into a burst store
    Run(RunArgs),

    /// Print a burst store's header and leading items
    Inspect {
        /// Path to the store file
        file: PathBuf,

        /// Number of items to print
        #[arg(short, long, default_value = "10")]
        limit: u64,
    },

    /// Print the alignment constants for a stage configuration
    Plan {
        #[command(flatten)]
        stage: StageArgs,
    },

    /// Show version information
    Version,
}

fn setup_logging(verbosity: u8) -> Result<TracingGuard> {
    let env_config = TracingConfig::from_env();

    // Explicit format override wins, otherwise pick by terminal
    let log_format = std::env::var("BURSTPACK_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse::<LogFormat>().ok())
        .unwrap_or_else(|| {
            if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
                LogFormat::Pretty
            } else {
                LogFormat::Compact
            }
        });

    let mut builder = TracingConfig::builder()
        .log_format(log_format)
        .verbosity(verbosity)
        .include_location(env_config.include_location())
        .include_thread_names(env_config.include_thread_names())
        .include_thread_ids(env_config.include_thread_ids());

    // An explicit filter in the environment beats -v
    if std::env::var_os("BURSTPACK_LOG_LEVEL").is_some() || std::env::var_os("RUST_LOG").is_some() {
        builder = builder.log_filter(env_config.log_filter());
    }

    init_tracing(builder.build())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run(args) => commands::run::run(&args).await,
        Commands::Inspect { file, limit } => commands::inspect::run(&file, limit),
        Commands::Plan { stage } => commands::plan::run(&stage),
        Commands::Version => commands::version::run(),
    }
}
