//! Scenario model and runner
//!
//! Scenarios are named, ordered sequences of steps loaded from YAML files.
//! The runner executes them against daemon endpoints through the
//! `DaemonApi` seam so assertions are made against structured state
//! rather than string matching.

mod config;
mod runner;

pub use config::{ScenarioDescriptor, Step, SubmitExpectation};
pub use runner::{run_scenario, Outcome, RunResult};
