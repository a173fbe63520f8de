//! Report aggregation
//!
//! Buffers per-scenario results as concurrent runs complete, then orders
//! them by registry registration order for the final summary. Collection
//! is idempotent: results are keyed by scenario name, so re-collecting
//! the same set produces the same summary.

use std::collections::HashMap;

use colored::Colorize;

use crate::scenario::{Outcome, RunResult};

/// Collects run results and produces the final summary
#[derive(Debug)]
pub struct ReportAggregator {
    /// Scenario names in registration order; drives summary ordering
    order: Vec<String>,
    results: HashMap<String, RunResult>,
}

impl ReportAggregator {
    /// Create an aggregator for the given registration-ordered name list
    pub fn new(order: Vec<String>) -> Self {
        Self {
            order,
            results: HashMap::new(),
        }
    }

    /// Record one result; a repeat for the same scenario replaces it
    pub fn add(&mut self, result: RunResult) {
        self.results.insert(result.scenario_name.clone(), result);
    }

    /// Record a batch of results
    pub fn collect(&mut self, results: impl IntoIterator<Item = RunResult>) {
        for result in results {
            self.add(result);
        }
    }

    /// Produce the final summary, ordered by registration order
    pub fn finalize(&self) -> RunSummary {
        let mut results = Vec::with_capacity(self.results.len());
        for name in &self.order {
            if let Some(result) = self.results.get(name) {
                results.push(result.clone());
            }
        }
        RunSummary { results }
    }
}

/// Final summary of one tester run
#[derive(Debug)]
pub struct RunSummary {
    pub results: Vec<RunResult>,
}

impl RunSummary {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    /// Process exit code: 0 when every scenario passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failed_count() == 0 {
            0
        } else {
            1
        }
    }

    /// Print the per-scenario lines and totals
    pub fn print(&self) {
        println!("\n{}", "Results:".blue().bold());

        for result in &self.results {
            let elapsed = format!("{:.1}s", result.duration.as_secs_f64());
            match &result.outcome {
                Outcome::Passed => {
                    println!(
                        "  {} {} ({})",
                        "✓".green(),
                        result.scenario_name,
                        elapsed.dimmed()
                    );
                }
                Outcome::Failed(reason) => {
                    println!(
                        "  {} {} ({}): {}",
                        "✗".red(),
                        result.scenario_name.white().bold(),
                        elapsed.dimmed(),
                        reason
                    );
                    if let Some(artifact) = &result.capture_artifact {
                        println!("      capture: {}", artifact.display().to_string().dimmed());
                    }
                }
                Outcome::TimedOut => {
                    println!(
                        "  {} {} ({}): timed out after {}/{} steps",
                        "✗".red(),
                        result.scenario_name.white().bold(),
                        elapsed.dimmed(),
                        result.steps_run,
                        result.steps_total
                    );
                    if let Some(artifact) = &result.capture_artifact {
                        println!("      capture: {}", artifact.display().to_string().dimmed());
                    }
                }
            }
        }

        let passed = self.passed_count();
        let failed = self.failed_count();
        let totals = format!("{} passed, {} failed, {} total", passed, failed, self.results.len());
        if failed == 0 {
            println!("\n{} {}\n", "✓".green().bold(), totals.green().bold());
        } else {
            println!("\n{} {}\n", "✗".red().bold(), totals.red().bold());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(name: &str, outcome: Outcome) -> RunResult {
        RunResult {
            scenario_name: name.to_string(),
            outcome,
            capture_artifact: None,
            steps_run: 1,
            steps_total: 1,
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_all_passed_exits_zero() {
        let mut aggregator = ReportAggregator::new(vec!["a".into(), "b".into()]);
        aggregator.collect([result("a", Outcome::Passed), result("b", Outcome::Passed)]);
        let summary = aggregator.finalize();
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.passed_count(), 2);
    }

    #[test]
    fn test_any_failure_exits_one() {
        let mut aggregator = ReportAggregator::new(vec!["a".into(), "b".into(), "c".into()]);
        aggregator.collect([
            result("a", Outcome::Passed),
            result("b", Outcome::Failed("step 2: assertion".into())),
            result("c", Outcome::TimedOut),
        ]);
        let summary = aggregator.finalize();
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.failed_count(), 2);
    }

    #[test]
    fn test_summary_follows_registration_order() {
        let mut aggregator =
            ReportAggregator::new(vec!["first".into(), "second".into(), "third".into()]);
        // Completion order differs from registration order
        aggregator.add(result("third", Outcome::Passed));
        aggregator.add(result("first", Outcome::Passed));
        aggregator.add(result("second", Outcome::Failed("boom".into())));

        let names: Vec<_> = aggregator
            .finalize()
            .results
            .iter()
            .map(|r| r.scenario_name.clone())
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_collect_is_idempotent() {
        let mut aggregator = ReportAggregator::new(vec!["a".into(), "b".into()]);
        let batch = [
            result("a", Outcome::Passed),
            result("b", Outcome::Failed("boom".into())),
        ];
        aggregator.collect(batch.clone());
        aggregator.collect(batch);

        let summary = aggregator.finalize();
        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.exit_code(), 1);
    }
}
