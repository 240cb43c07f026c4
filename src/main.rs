//! restprobe - scenario-driven HTTP API test runner
//!
//! Runs ordered HTTP steps with assertions and captures, then reports
//! per-step results. Exits 0 when every scenario passed, 1 when any
//! assertion or request failed, 2 when scenarios could not be run.

use std::path::PathBuf;

use clap::Parser;
use restprobe::common::logging;
use restprobe::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "restprobe", about = "Scenario-driven HTTP API test runner")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show passing assertions, captures and debug logs
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write full logs, including response bodies, to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Held until exit so the file writer flushes
    let _guard = match &cli.log_file {
        Some(path) => match logging::init_with_file(path, cli.verbose) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Error: could not open log file '{}': {e}", path.display());
                std::process::exit(2);
            }
        },
        None => {
            logging::init_cli(cli.verbose);
            None
        }
    };

    match cli::dispatch(cli.command, cli.config, cli.verbose).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
