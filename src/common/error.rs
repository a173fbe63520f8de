//! Error types for the tester CLI
//!
//! Only configuration/startup errors are allowed to escape to `main` and
//! abort the process (exit code 2). Scenario failures and timeouts are
//! recorded as run outcomes, and capture problems degrade to "no artifact";
//! none of those surface through this type at the top level.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tester CLI
#[derive(Error, Debug)]
pub enum Error {
    // === Registry Errors ===
    #[error("Scenario '{name}' is already registered")]
    DuplicateScenario { name: String },

    #[error("Scenario '{name}' not found in registry")]
    ScenarioNotFound { name: String },

    #[error("Registry is empty: no scenarios matched (directory '{dir}', filter {filter:?})")]
    RegistryEmpty { dir: String, filter: Option<String> },

    // === Daemon Errors ===
    #[error("Daemon '{endpoint}' is unreachable: {reason}")]
    DaemonUnreachable { endpoint: String, reason: String },

    #[error("Daemon request to '{endpoint}' failed: {reason}")]
    DaemonRequest { endpoint: String, reason: String },

    #[error("Daemon returned malformed response: {0}")]
    DaemonResponse(String),

    // === Capture Errors ===
    #[error("Failed to spawn capture process '{program}': {reason}")]
    CaptureSpawn { program: String, reason: String },

    #[error("Capture process exited early with status {0}")]
    CaptureExited(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("Failed to parse scenario file '{path}': {error}")]
    ScenarioParse { path: String, error: String },
}

impl Error {
    /// Create a daemon unreachable error
    pub fn daemon_unreachable(endpoint: &str, reason: impl ToString) -> Self {
        Self::DaemonUnreachable {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a daemon request error
    pub fn daemon_request(endpoint: &str, reason: impl ToString) -> Self {
        Self::DaemonRequest {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a scenario parse error
    pub fn scenario_parse(path: &std::path::Path, error: impl ToString) -> Self {
        Self::ScenarioParse {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error belongs to the fatal configuration/startup class
    /// (process exit code 2). Everything else is expected to be recovered
    /// into a run outcome before it reaches `main`.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::ConfigParse(_)
                | Error::RegistryEmpty { .. }
                | Error::DuplicateScenario { .. }
                | Error::ScenarioParse { .. }
                | Error::DaemonUnreachable { .. }
                | Error::FileRead { .. }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let endpoint = e
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if e.is_connect() {
            Error::DaemonUnreachable {
                endpoint,
                reason: e.to_string(),
            }
        } else {
            Error::DaemonRequest {
                endpoint,
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_class_is_fatal() {
        assert!(Error::Config("bad".into()).is_configuration());
        assert!(Error::RegistryEmpty {
            dir: "scenarios".into(),
            filter: None
        }
        .is_configuration());
        assert!(Error::DaemonUnreachable {
            endpoint: "http://localhost:1".into(),
            reason: "refused".into()
        }
        .is_configuration());
    }

    #[test]
    fn recovered_errors_are_not_fatal() {
        assert!(!Error::CaptureExited("1".into()).is_configuration());
        assert!(!Error::DaemonResponse("garbage".into()).is_configuration());
    }
}
