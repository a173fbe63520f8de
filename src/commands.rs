//! CLI command definitions
//!
//! Defines the clap commands for the tester CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the registered scenarios against the configured daemons
    Registry {
        /// Directory of YAML scenario files
        #[arg(long, default_value = "scenarios")]
        scenarios: PathBuf,

        /// Daemon endpoint base URL (repeatable); overrides the config file
        #[arg(long = "endpoint")]
        endpoints: Vec<String>,

        /// Only run scenarios whose name contains this pattern
        #[arg(long)]
        filter: Option<String>,

        /// Worker-pool size for concurrent scenarios
        #[arg(long)]
        workers: Option<usize>,

        /// Bracket each scenario with a packet capture, keeping the
        /// artifact when the scenario does not pass
        #[arg(long)]
        capture_on_failure: bool,

        /// Path to the TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List registered scenarios without running them
    List {
        /// Directory of YAML scenario files
        #[arg(long, default_value = "scenarios")]
        scenarios: PathBuf,

        /// Only list scenarios whose name contains this pattern
        #[arg(long)]
        filter: Option<String>,

        /// Show descriptions and step counts
        #[arg(long, short)]
        verbose: bool,
    },
}
