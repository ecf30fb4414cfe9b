mod app;
mod cli;
mod config;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use intake_logging::intake_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match app::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            intake_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
