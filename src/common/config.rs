//! Configuration file handling
//!
//! Values come from an optional TOML file; CLI flags override individual
//! fields after loading. Missing file means defaults everywhere.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Daemon endpoint settings
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Scenario runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Packet capture settings
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Daemon endpoint settings
#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    /// Base URLs of the daemon instances under test
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

/// Scenario runner settings
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Worker-pool size for concurrent scenarios
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default per-scenario timeout in seconds, used when a scenario
    /// does not specify its own
    #[serde(default = "default_scenario_timeout")]
    pub scenario_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            scenario_timeout_secs: default_scenario_timeout(),
        }
    }
}

fn default_workers() -> usize {
    4
}
fn default_scenario_timeout() -> u64 {
    60
}

/// Packet capture settings
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Recorder executable; resolved via PATH when not an absolute path
    #[serde(default = "default_capture_program")]
    pub program: String,

    /// Network interface handed to the recorder
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Directory for capture artifacts
    #[serde(default = "paths::default_capture_dir")]
    pub output_dir: PathBuf,

    /// Extra arguments appended to the recorder command line
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Grace period before the recorder is force-killed on teardown
    #[serde(default = "default_stop_grace")]
    pub stop_grace_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: default_capture_program(),
            interface: default_interface(),
            output_dir: paths::default_capture_dir(),
            extra_args: Vec::new(),
            stop_grace_secs: default_stop_grace(),
        }
    }
}

fn default_capture_program() -> String {
    "tcpdump".to_string()
}
fn default_interface() -> String {
    "any".to_string()
}
fn default_stop_grace() -> u64 {
    5
}

impl Config {
    /// Load configuration from an explicit path, or from the default
    /// config file location
    ///
    /// Returns default configuration if no file exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => paths::config_path().filter(|p| p.exists()),
        };

        if let Some(path) = path {
            let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            return toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()));
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.daemon.endpoints.is_empty());
        assert_eq!(config.runner.workers, 4);
        assert_eq!(config.capture.program, "tcpdump");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            endpoints = ["http://127.0.0.1:8302"]

            [runner]
            workers = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.daemon.endpoints.len(), 1);
        assert_eq!(config.runner.workers, 2);
        // Unspecified sections fall back to defaults
        assert_eq!(config.daemon.request_timeout_secs, 10);
        assert_eq!(config.capture.interface, "any");
    }

    #[test]
    fn test_reject_malformed_config() {
        let result: std::result::Result<Config, _> = toml::from_str("[runner]\nworkers = \"two\"");
        assert!(result.is_err());
    }
}
