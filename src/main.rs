//! issueboard - GitHub issue boards driven by chat commands.

use clap::Parser;
use std::process::ExitCode;

use issueboard::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = match logging::init() {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args = Commands::parse();

    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
