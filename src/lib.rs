//! Registry-driven test harness for blockchain daemons
//!
//! Coordinates execution of named test scenarios against one or more
//! running daemon instances, optionally bracketing each run with an
//! external packet-capture subprocess so failing runs leave a forensic
//! artifact.

pub mod capture;
pub mod cli;
pub mod commands;
pub mod common;
pub mod daemon;
pub mod registry;
pub mod report;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use registry::ScenarioRegistry;
pub use scenario::{Outcome, RunResult, ScenarioDescriptor};
