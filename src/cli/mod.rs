//! CLI command handling
//!
//! Dispatches CLI commands: loads configuration and the scenario
//! registry, drives the worker pool for the `registry` subcommand, and
//! aggregates results into the final summary and exit code.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use futures_util::future::try_join_all;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::capture::CaptureController;
use crate::commands::Commands;
use crate::common::config::RunnerConfig;
use crate::common::{Config, Error, Result};
use crate::daemon::{DaemonApi, HttpDaemon};
use crate::registry::ScenarioRegistry;
use crate::report::ReportAggregator;
use crate::scenario::{run_scenario, Outcome, RunResult, ScenarioDescriptor};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Registry {
            scenarios,
            endpoints,
            filter,
            workers,
            capture_on_failure,
            config,
        } => {
            let config = Config::load(config.as_deref())?;
            run_registry(
                &scenarios,
                endpoints,
                filter,
                workers,
                capture_on_failure,
                config,
            )
            .await
        }

        Commands::List {
            scenarios,
            filter,
            verbose,
        } => {
            let registry = ScenarioRegistry::load_dir(&scenarios)?;
            list_scenarios(&registry, filter.as_deref(), verbose);
            Ok(0)
        }
    }
}

/// Run the `registry` subcommand
async fn run_registry(
    scenario_dir: &Path,
    cli_endpoints: Vec<String>,
    filter: Option<String>,
    workers: Option<usize>,
    capture_on_failure: bool,
    config: Config,
) -> Result<i32> {
    let registry = ScenarioRegistry::load_dir(scenario_dir)?;
    let mut selected: Vec<ScenarioDescriptor> = registry
        .filtered(filter.as_deref())
        .into_iter()
        .cloned()
        .collect();
    apply_runner_defaults(&mut selected, &config.runner);

    if selected.is_empty() {
        return Err(Error::RegistryEmpty {
            dir: scenario_dir.display().to_string(),
            filter,
        });
    }

    let endpoints = if cli_endpoints.is_empty() {
        config.daemon.endpoints.clone()
    } else {
        cli_endpoints
    };
    if endpoints.is_empty() {
        return Err(Error::Config(
            "no daemon endpoints configured; pass --endpoint or set [daemon].endpoints".to_string(),
        ));
    }

    let request_timeout = Duration::from_secs(config.daemon.request_timeout_secs);
    let daemons: Vec<Arc<dyn DaemonApi>> = endpoints
        .iter()
        .map(|e| HttpDaemon::new(e, request_timeout).map(|d| Arc::new(d) as Arc<dyn DaemonApi>))
        .collect::<Result<_>>()?;

    check_daemons(&daemons).await?;
    tracing::info!(daemons = daemons.len(), scenarios = selected.len(), "starting run");

    let capture = capture_on_failure
        .then(|| Arc::new(CaptureController::new(config.capture.clone())));

    let summary = execute_scenarios(
        selected,
        registry.names(),
        daemons,
        capture,
        workers.unwrap_or(config.runner.workers),
    )
    .await;

    summary.print();
    Ok(summary.exit_code())
}

/// Fill in config-level defaults for fields the YAML left unspecified
fn apply_runner_defaults(scenarios: &mut [ScenarioDescriptor], runner: &RunnerConfig) {
    for descriptor in scenarios {
        descriptor
            .timeout_secs
            .get_or_insert(runner.scenario_timeout_secs);
    }
}

/// Probe every endpoint before dispatching anything; an unreachable
/// daemon is a startup error, not a scenario failure
pub async fn check_daemons(daemons: &[Arc<dyn DaemonApi>]) -> Result<()> {
    try_join_all(daemons.iter().map(|d| d.health())).await?;
    Ok(())
}

/// Drive the worker pool: scenarios run concurrently up to the pool size,
/// steps within a scenario stay strictly sequential in the runner
pub async fn execute_scenarios(
    scenarios: Vec<ScenarioDescriptor>,
    registration_order: Vec<String>,
    daemons: Vec<Arc<dyn DaemonApi>>,
    capture: Option<Arc<CaptureController>>,
    workers: usize,
) -> crate::report::RunSummary {
    let (cancel_tx, cancel_rx) = watch::channel(false);

    // Ctrl-C requests a global cancellation, propagated to all in-flight
    // scenarios through the watch channel
    let cancel_for_signal = cancel_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            let _ = cancel_for_signal.send(true);
        }
    });

    let pool = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    // Task id to (name, step count), for synthesizing a result when a
    // task dies without producing one
    let mut dispatched: HashMap<tokio::task::Id, (String, usize)> = HashMap::new();

    for descriptor in scenarios {
        let daemons = daemons.clone();
        let capture = capture.clone();
        let cancel = cancel_rx.clone();
        let pool = pool.clone();
        let task_key = (descriptor.name.clone(), descriptor.steps.len());

        let handle = tasks.spawn(async move {
            // Semaphore is never closed while tasks run
            let _permit = pool.acquire().await.expect("worker pool closed");

            // Capture binds to the scenario's primary endpoint
            let endpoint = daemons[0].endpoint().to_string();
            let name = descriptor.name.clone();
            match capture {
                Some(capture) => {
                    capture
                        .with_capture(&endpoint, &name, async {
                            run_scenario(&descriptor, &daemons, cancel).await
                        })
                        .await
                }
                None => run_scenario(&descriptor, &daemons, cancel).await,
            }
        });
        dispatched.insert(handle.id(), task_key);
    }

    let mut aggregator = ReportAggregator::new(registration_order);
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, result)) => aggregator.add(result),
            Err(e) => {
                // Every dispatched scenario must still yield a result;
                // dropping it here could turn a broken run into exit 0
                tracing::error!(error = %e, "scenario task panicked");
                if let Some((name, steps_total)) = dispatched.get(&e.id()) {
                    aggregator.add(RunResult {
                        scenario_name: name.clone(),
                        outcome: Outcome::Failed("scenario task panicked".to_string()),
                        capture_artifact: None,
                        steps_run: 0,
                        steps_total: *steps_total,
                        duration: Duration::ZERO,
                    });
                }
            }
        }
    }

    drop(cancel_tx);
    aggregator.finalize()
}

/// Print the registry contents
fn list_scenarios(registry: &ScenarioRegistry, filter: Option<&str>, verbose: bool) {
    let selected = registry.filtered(filter);

    println!("{}", "Registered scenarios:".blue().bold());
    for descriptor in &selected {
        if verbose {
            println!(
                "  {} ({} steps, {}s timeout)",
                descriptor.name,
                descriptor.steps.len(),
                descriptor.effective_timeout()
            );
            if let Some(desc) = &descriptor.description {
                println!("      {}", desc.dimmed());
            }
        } else {
            println!("  {}", descriptor.name);
        }
    }
    println!("\nTotal: {} scenario(s)", selected.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::mock::MockDaemon;

    fn descriptor(yaml: &str) -> ScenarioDescriptor {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_config_timeout_fills_unspecified_scenarios() {
        let mut scenarios = vec![
            descriptor("name: uses-default\nsteps: []"),
            descriptor("name: explicit\ntimeout_secs: 5\nsteps: []"),
        ];
        let runner = RunnerConfig {
            workers: 1,
            scenario_timeout_secs: 123,
        };

        apply_runner_defaults(&mut scenarios, &runner);

        assert_eq!(scenarios[0].timeout_secs, Some(123));
        // An explicit scenario timeout wins over the config default
        assert_eq!(scenarios[1].timeout_secs, Some(5));
    }

    #[tokio::test]
    async fn test_unhealthy_daemon_fails_startup() {
        let daemons: Vec<Arc<dyn DaemonApi>> = vec![
            Arc::new(MockDaemon::new("mock-0")),
            Arc::new(MockDaemon::new("mock-1").unhealthy()),
        ];

        let err = check_daemons(&daemons).await.unwrap_err();
        // Startup-class error, reported as exit code 2 by main
        assert!(err.is_configuration(), "got: {err}");
    }

    #[tokio::test]
    async fn test_healthy_daemons_pass_startup_probe() {
        let daemons: Vec<Arc<dyn DaemonApi>> =
            vec![Arc::new(MockDaemon::new("mock-0"))];
        check_daemons(&daemons).await.unwrap();
    }
}
