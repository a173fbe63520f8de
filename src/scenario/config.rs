//! Scenario descriptor types
//!
//! Defines the data structures for deserializing YAML scenario files.
//! Descriptors are immutable once registered; steps are created at
//! registry-load time and never mutated.

use serde::Deserialize;
use serde_json::Value;

/// Timeout applied when neither the scenario nor the runner config
/// specifies one
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioDescriptor {
    /// Name of the scenario; unique key within the registry
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Whole-scenario timeout in seconds; when absent, the runner
    /// config's default is filled in before dispatch
    pub timeout_secs: Option<u64>,
    /// Number of daemon instances this scenario needs
    #[serde(default = "default_required_daemons")]
    pub required_daemons: usize,
    /// The ordered sequence of steps to execute
    pub steps: Vec<Step>,
}

impl ScenarioDescriptor {
    /// Timeout to enforce for this scenario
    pub fn effective_timeout(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

fn default_required_daemons() -> usize {
    1
}

/// A single step in a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Submit a transaction to a daemon
    SendTransaction {
        /// Transaction payload, forwarded verbatim
        payload: Value,
        /// Index into the endpoint list (default: 0)
        #[serde(default)]
        daemon: usize,
        /// Optional expectations on the submission receipt
        expect: Option<SubmitExpectation>,
    },
    /// Poll a state query until a condition holds
    AwaitCondition {
        /// State query forwarded to the daemon
        query: String,
        /// Expected value (exact match)
        equals: Option<Value>,
        /// Expected substring of the value's string form
        contains: Option<String>,
        /// Condition timeout in seconds (default: 30)
        timeout_secs: Option<u64>,
        /// Poll interval in milliseconds (default: 250)
        poll_interval_ms: Option<u64>,
        /// Index into the endpoint list (default: 0)
        #[serde(default)]
        daemon: usize,
    },
    /// Query state once and assert on the result
    AssertState {
        /// State query forwarded to the daemon
        query: String,
        /// Expected value (exact match)
        equals: Option<Value>,
        /// Expected substring of the value's string form
        contains: Option<String>,
        /// Require that the value exists (is not null)
        #[serde(default)]
        exists: bool,
        /// Index into the endpoint list (default: 0)
        #[serde(default)]
        daemon: usize,
    },
}

impl Step {
    /// Endpoint index this step talks to
    pub fn daemon_index(&self) -> usize {
        match self {
            Step::SendTransaction { daemon, .. }
            | Step::AwaitCondition { daemon, .. }
            | Step::AssertState { daemon, .. } => *daemon,
        }
    }

    /// Short label used in failure reasons and logs
    pub fn label(&self) -> &'static str {
        match self {
            Step::SendTransaction { .. } => "send_transaction",
            Step::AwaitCondition { .. } => "await_condition",
            Step::AssertState { .. } => "assert_state",
        }
    }
}

/// Expectations on a transaction submission receipt
#[derive(Deserialize, Debug, Clone)]
pub struct SubmitExpectation {
    /// Whether the daemon should accept the transaction (default: true)
    pub accepted: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario_yaml() {
        let yaml = r#"
name: transfer-roundtrip
description: Submit a transfer and wait for it to land in a block
timeout_secs: 90
steps:
  - action: send_transaction
    payload:
      kind: transfer
      amount: 10
  - action: await_condition
    query: chain.height
    equals: 2
    timeout_secs: 60
  - action: assert_state
    query: accounts.alice.balance
    equals: 90
"#;
        let scenario: ScenarioDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.name, "transfer-roundtrip");
        assert_eq!(scenario.timeout_secs, Some(90));
        assert_eq!(scenario.effective_timeout(), 90);
        assert_eq!(scenario.required_daemons, 1);
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(scenario.steps[0], Step::SendTransaction { .. }));
        assert!(matches!(scenario.steps[1], Step::AwaitCondition { .. }));
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
name: minimal
steps:
  - action: assert_state
    query: chain.height
    exists: true
"#;
        let scenario: ScenarioDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.timeout_secs, None);
        assert_eq!(scenario.effective_timeout(), DEFAULT_TIMEOUT_SECS);
        assert_eq!(scenario.required_daemons, 1);
        assert_eq!(scenario.steps[0].daemon_index(), 0);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = r#"
name: bad
steps:
  - action: reboot_daemon
"#;
        assert!(serde_yaml::from_str::<ScenarioDescriptor>(yaml).is_err());
    }
}
