//! `poolctl` binary.
//!
//! ## Usage
//!
//! 1. Export `POOLCTL_API_TOKEN` (or put it in a `.env` file)
//! 2. Run: `poolctl create my-pool --cluster my-cluster --replicas 3`

#![allow(clippy::print_stderr)] // Errors are reported on stderr

use std::io;
use std::process::ExitCode;

use env_logger::Env;
use poolctl::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let (cli, flags) = match Cli::parse_with_provenance(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };

    let mut stdout = io::stdout().lock();
    match poolctl::run(cli, flags, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
