//! HiL test sequencer CLI
//!
//! Runs simulated hardware-in-the-loop test suites against a target device
//! and reports progress, results and aggregate statistics on the terminal.

use std::process::ExitCode;

use clap::Parser;
use hil::commands::{Commands, GlobalArgs};
use hil::common::{logging, paths};
use hil::cli;

#[derive(Parser)]
#[command(name = "hil", about = "Hardware-in-the-loop test sequencer")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Held until exit so the file writer flushes
    let _guard = match &cli.global.log_file {
        Some(path) => {
            let path = path
                .clone()
                .or_else(|| paths::log_dir().map(|dir| dir.join("hil.log")));
            match path {
                Some(path) => match logging::init_with_file(&path) {
                    Ok(guard) => Some(guard),
                    Err(e) => {
                        eprintln!("Error: Failed to open log file {}: {e}", path.display());
                        return ExitCode::FAILURE;
                    }
                },
                None => {
                    eprintln!("Error: Could not determine a log directory");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            logging::init_cli();
            None
        }
    };

    match cli::dispatch(&cli.global, cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
