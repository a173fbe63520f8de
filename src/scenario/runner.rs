//! Scenario runner
//!
//! Executes one scenario's steps strictly in order against the daemon
//! endpoints. Step failures are expected, recoverable outcomes: they
//! abort the remaining steps and become `Outcome::Failed`, never a
//! process-fatal error. The whole scenario runs under its own timeout,
//! and a global cancellation signal aborts in-flight step I/O.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::watch;

use crate::daemon::DaemonApi;

use super::config::{ScenarioDescriptor, Step, SubmitExpectation};

/// Final outcome of one scenario run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    TimedOut,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Result of running one scenario
///
/// Owned by the report aggregator once collected.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub scenario_name: String,
    pub outcome: Outcome,
    /// Path to the capture artifact, present only for non-passing runs
    /// with capture enabled
    pub capture_artifact: Option<PathBuf>,
    pub steps_run: usize,
    pub steps_total: usize,
    pub duration: Duration,
}

/// Run a scenario against the given daemon endpoints
pub async fn run_scenario(
    descriptor: &ScenarioDescriptor,
    daemons: &[Arc<dyn DaemonApi>],
    cancel: watch::Receiver<bool>,
) -> RunResult {
    let started = Instant::now();
    let steps_total = descriptor.steps.len();

    let result = |outcome, steps_run| RunResult {
        scenario_name: descriptor.name.clone(),
        outcome,
        capture_artifact: None,
        steps_run,
        steps_total,
        duration: started.elapsed(),
    };

    if daemons.len() < descriptor.required_daemons {
        return result(
            Outcome::Failed(format!(
                "requires {} daemon(s), only {} configured",
                descriptor.required_daemons,
                daemons.len()
            )),
            0,
        );
    }

    tracing::info!(scenario = %descriptor.name, steps = steps_total, "running scenario");

    let steps_done = AtomicUsize::new(0);
    let timeout = Duration::from_secs(descriptor.effective_timeout());
    let mut cancel = cancel;

    let outcome = tokio::select! {
        _ = cancelled(&mut cancel) => {
            tracing::warn!(scenario = %descriptor.name, "scenario cancelled");
            Outcome::Failed("run cancelled".to_string())
        }
        res = tokio::time::timeout(timeout, run_steps(descriptor, daemons, &steps_done)) => {
            match res {
                Ok(Ok(())) => Outcome::Passed,
                Ok(Err(reason)) => Outcome::Failed(reason),
                Err(_) => {
                    tracing::warn!(scenario = %descriptor.name, timeout_secs = descriptor.effective_timeout(), "scenario timed out");
                    Outcome::TimedOut
                }
            }
        }
    };

    result(outcome, steps_done.load(Ordering::Relaxed))
}

/// Wait until the cancellation flag flips to true
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow() {
        if cancel.changed().await.is_err() {
            // Sender dropped: no cancellation will ever arrive
            std::future::pending::<()>().await;
        }
    }
}

/// Execute all steps in order; the first failure aborts the rest
async fn run_steps(
    descriptor: &ScenarioDescriptor,
    daemons: &[Arc<dyn DaemonApi>],
    steps_done: &AtomicUsize,
) -> std::result::Result<(), String> {
    for (i, step) in descriptor.steps.iter().enumerate() {
        let step_num = i + 1;

        let daemon = daemons.get(step.daemon_index()).ok_or_else(|| {
            format!(
                "step {step_num} ({}): daemon index {} out of range",
                step.label(),
                step.daemon_index()
            )
        })?;

        tracing::debug!(
            scenario = %descriptor.name,
            step = step_num,
            action = step.label(),
            daemon = daemon.endpoint(),
            "executing step"
        );

        execute_step(step, daemon.as_ref())
            .await
            .map_err(|reason| format!("step {step_num} ({}): {reason}", step.label()))?;

        steps_done.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}

/// Execute a single step
async fn execute_step(step: &Step, daemon: &dyn DaemonApi) -> std::result::Result<(), String> {
    match step {
        Step::SendTransaction {
            payload, expect, ..
        } => execute_send_transaction(daemon, payload, expect.as_ref()).await,
        Step::AwaitCondition {
            query,
            equals,
            contains,
            timeout_secs,
            poll_interval_ms,
            ..
        } => {
            execute_await_condition(
                daemon,
                query,
                equals.as_ref(),
                contains.as_deref(),
                timeout_secs.unwrap_or(30),
                poll_interval_ms.unwrap_or(250),
            )
            .await
        }
        Step::AssertState {
            query,
            equals,
            contains,
            exists,
            ..
        } => execute_assert_state(daemon, query, equals.as_ref(), contains.as_deref(), *exists).await,
    }
}

async fn execute_send_transaction(
    daemon: &dyn DaemonApi,
    payload: &Value,
    expect: Option<&SubmitExpectation>,
) -> std::result::Result<(), String> {
    let receipt = daemon
        .submit_transaction(payload)
        .await
        .map_err(|e| e.to_string())?;

    // Unless the scenario says otherwise, the daemon must accept
    let expect_accepted = expect.and_then(|e| e.accepted).unwrap_or(true);
    if receipt.accepted != expect_accepted {
        return Err(format!(
            "expected accepted={}, daemon returned accepted={} ({})",
            expect_accepted,
            receipt.accepted,
            receipt.info.as_deref().unwrap_or("no detail")
        ));
    }
    Ok(())
}

async fn execute_await_condition(
    daemon: &dyn DaemonApi,
    query: &str,
    equals: Option<&Value>,
    contains: Option<&str>,
    timeout_secs: u64,
    poll_interval_ms: u64,
) -> std::result::Result<(), String> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    let interval = Duration::from_millis(poll_interval_ms);

    loop {
        let value = daemon
            .query_state(query)
            .await
            .map_err(|e| e.to_string())?;

        if condition_met(&value, equals, contains) {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(format!(
                "condition on '{query}' not met within {timeout_secs}s (last value: {value})"
            ));
        }
        tokio::time::sleep(interval).await;
    }
}

async fn execute_assert_state(
    daemon: &dyn DaemonApi,
    query: &str,
    equals: Option<&Value>,
    contains: Option<&str>,
    exists: bool,
) -> std::result::Result<(), String> {
    if equals.is_none() && contains.is_none() && !exists {
        return Err(format!("assert_state on '{query}' specifies no assertion"));
    }

    let value = daemon
        .query_state(query)
        .await
        .map_err(|e| e.to_string())?;

    if exists && value.is_null() {
        return Err(format!("'{query}' does not exist"));
    }

    if let Some(expected) = equals {
        if &value != expected {
            return Err(format!("'{query}': expected {expected}, got {value}"));
        }
    }

    if let Some(substr) = contains {
        if !value_text(&value).contains(substr) {
            return Err(format!("'{query}': expected value containing '{substr}', got {value}"));
        }
    }

    Ok(())
}

/// Whether the awaited condition holds for `value`
fn condition_met(value: &Value, equals: Option<&Value>, contains: Option<&str>) -> bool {
    if equals.is_none() && contains.is_none() {
        // No predicate means any non-null value satisfies the condition
        return !value.is_null();
    }
    if let Some(expected) = equals {
        if value != expected {
            return false;
        }
    }
    if let Some(substr) = contains {
        if !value_text(value).contains(substr) {
            return false;
        }
    }
    true
}

/// String form used for `contains` matching; bare strings compare without
/// their JSON quotes
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
