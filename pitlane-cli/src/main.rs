//! Pitlane CLI - tools for authors of decision modules.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pitlane_host::observability::{TracingConfig, init_tracing};

/// Pitlane - run and inspect WebAssembly decision modules.
#[derive(Parser)]
#[command(name = "pitlane")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Host configuration YAML file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a module's exports and the ABI variant it would be driven with
    Probe {
        /// Module URL or local path
        url: String,
    },

    /// Run decisions against a module and print the responses as JSON
    Decide {
        /// Module URL or local path
        url: String,

        #[command(flatten)]
        request: commands::decide::RequestArgs,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "1")]
        ticks: u32,
    },

    /// Show version information
    Version,
}

/// Logging from `PITLANE_LOG_*` / `RUST_LOG`; `-v` flags replace the filter.
fn setup_logging(verbosity: u8) -> Result<()> {
    let config = TracingConfig::from_env();
    let config = match verbosity {
        0 => config,
        1 => config.with_log_filter("info"),
        2 => config.with_log_filter("debug"),
        _ => config.with_log_filter("trace"),
    };
    init_tracing(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Probe { url } => commands::probe::run(&url, config).await,
        Commands::Decide {
            url,
            request,
            ticks,
        } => commands::decide::run(&url, request, ticks, config).await,
        Commands::Version => commands::version::run(),
    }
}
