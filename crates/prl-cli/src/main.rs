mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!(
        "🚀 PRLStructure CLI v{} starting up.",
        env!("CARGO_PKG_VERSION")
    );
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let quiet = cli.quiet;
    let command_result = match cli.command {
        Commands::Sublattice(args) => {
            info!("Dispatching to 'sublattice' command.");
            commands::sublattice::run(args)
        }
        Commands::Endmembers(args) => {
            info!("Dispatching to 'endmembers' command.");
            commands::endmembers::run(args, quiet)
        }
        Commands::Dilute(args) => {
            info!("Dispatching to 'dilute' command.");
            commands::dilute::run(args, quiet)
        }
        Commands::Sqs(args) => {
            info!("Dispatching to 'sqs' command.");
            commands::sqs::run(args, quiet)
        }
    };

    match &command_result {
        Ok(_) => {
            info!("✅ Command completed successfully.");
            if !quiet {
                println!("✅ Command completed successfully.");
            }
        }
        Err(e) => {
            error!("❌ Command failed: {}", e);
        }
    }

    command_result
}
