//! Tester CLI entry point
//!
//! Exit codes: 0 = all scenarios passed, 1 = at least one failure or
//! timeout, 2 = configuration/startup error.

use clap::Parser;
use tester::commands::Commands;
use tester::{cli, common};

#[derive(Parser)]
#[command(name = "tester", about = "Registry-driven test harness for blockchain daemons")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    common::logging::init();

    let cli = Cli::parse();

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if !e.is_configuration() {
                tracing::error!(error = %e, "unexpected fatal error");
            }
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
