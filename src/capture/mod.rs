//! Packet capture controller
//!
//! Brackets a scenario run with an external packet recorder spawned as a
//! subprocess. The session is a scoped resource: the child is spawned with
//! `kill_on_drop`, so every exit path of the wrapped future, including a
//! panic, terminates the recorder. Capture failures degrade to "no
//! artifact" and never abort the scenario itself.
//!
//! One capture session exists at a time per daemon endpoint; concurrent
//! scenarios targeting the same endpoint are serialized here.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::process::Command as TokioCommand;
use tokio::sync::Mutex as AsyncMutex;

use crate::common::config::CaptureConfig;
use crate::common::{paths, Error, Result};
use crate::scenario::RunResult;

/// A running recorder subprocess bound to one scenario run
struct CaptureSession {
    child: tokio::process::Child,
    output_path: PathBuf,
}

impl CaptureSession {
    #[cfg(all(unix, test))]
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Stop the recorder: polite signal first, force-kill after the grace
    /// period, and always reap the child
    async fn stop(mut self, grace: Duration) -> PathBuf {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            // SIGTERM lets recorders flush their output file
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(status = %status, "capture process stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to reap capture process");
            }
            Err(_) => {
                tracing::warn!("capture process ignored stop signal, killing");
                let _ = self.child.kill().await;
            }
        }

        self.output_path
    }
}

/// Controller that owns recorder spawning and per-endpoint serialization
pub struct CaptureController {
    config: CaptureConfig,
    /// Resolved recorder executable; None disables capture
    program: Option<PathBuf>,
    /// Per-endpoint locks; held for the duration of a session
    locks: std::sync::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CaptureController {
    /// Create a controller, resolving the recorder executable up front
    ///
    /// An unresolvable recorder disables capture with a warning rather
    /// than failing the run.
    pub fn new(config: CaptureConfig) -> Self {
        let program = resolve_program(&config.program);
        if program.is_none() {
            tracing::warn!(
                program = %config.program,
                "capture recorder not found, scenarios will run without capture"
            );
        }
        Self {
            config,
            program,
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.program.is_some()
    }

    fn endpoint_lock(&self, endpoint: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Spawn the recorder for one scenario run
    async fn start_session(&self, scenario: &str) -> Result<CaptureSession> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| Error::CaptureSpawn {
                program: self.config.program.clone(),
                reason: "recorder executable not found".to_string(),
            })?;

        paths::ensure_dir(&self.config.output_dir)?;
        let output_path = self.config.output_dir.join(artifact_name(scenario));

        let mut child = TokioCommand::new(program)
            .arg("-i")
            .arg(&self.config.interface)
            .arg("-w")
            .arg(&output_path)
            .args(&self.config.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::CaptureSpawn {
                program: program.display().to_string(),
                reason: e.to_string(),
            })?;

        // Catch recorders that reject their arguments and exit immediately
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Some(status) = child.try_wait()? {
            return Err(Error::CaptureExited(status.to_string()));
        }

        tracing::debug!(
            scenario,
            output = %output_path.display(),
            "capture session started"
        );

        Ok(CaptureSession { child, output_path })
    }

    /// Run `fut` bracketed by a capture session on `endpoint`
    ///
    /// The artifact path is attached to the result only when the outcome
    /// is not Passed; a passing run's capture file is deleted.
    pub async fn with_capture<F>(&self, endpoint: &str, scenario: &str, fut: F) -> RunResult
    where
        F: std::future::Future<Output = RunResult>,
    {
        if !self.enabled() {
            return fut.await;
        }

        let lock = self.endpoint_lock(endpoint);
        let _guard = lock.lock().await;

        let session = match self.start_session(scenario).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(scenario, error = %e, "capture unavailable, running without it");
                return fut.await;
            }
        };

        let mut result = fut.await;

        let artifact = session
            .stop(Duration::from_secs(self.config.stop_grace_secs))
            .await;

        if result.outcome.passed() {
            // No forensic value in captures of passing runs
            if let Err(e) = std::fs::remove_file(&artifact) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %artifact.display(), error = %e, "could not discard capture");
                }
            }
        } else {
            tracing::info!(
                scenario,
                artifact = %artifact.display(),
                "capture artifact retained"
            );
            result.capture_artifact = Some(artifact);
        }

        result
    }
}

/// Resolve the recorder executable: absolute/relative paths as-is when
/// they exist, bare names through PATH
fn resolve_program(program: &str) -> Option<PathBuf> {
    let path = PathBuf::from(program);
    if path.components().count() > 1 {
        return path.exists().then_some(path);
    }
    which::which(program).ok()
}

fn artifact_name(scenario: &str) -> String {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let safe: String = scenario
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("{safe}-{stamp}.pcap")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::scenario::{Outcome, RunResult};
    use std::os::unix::fs::PermissionsExt;

    /// Fake recorder that ignores its arguments and sleeps until signalled
    fn fake_recorder(dir: &std::path::Path) -> PathBuf {
        let script = dir.join("recorder.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn test_config(dir: &std::path::Path) -> CaptureConfig {
        CaptureConfig {
            program: fake_recorder(dir).display().to_string(),
            interface: "lo".to_string(),
            output_dir: dir.join("captures"),
            extra_args: Vec::new(),
            stop_grace_secs: 5,
        }
    }

    fn run_result(outcome: Outcome) -> RunResult {
        RunResult {
            scenario_name: "fake".to_string(),
            outcome,
            capture_artifact: None,
            steps_run: 1,
            steps_total: 1,
            duration: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_session_teardown_reaps_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let controller = CaptureController::new(test_config(dir.path()));

        let session = controller.start_session("teardown").await.unwrap();
        let pid = session.pid().unwrap();
        session.stop(Duration::from_secs(5)).await;

        // After stop the process must be gone, not a zombie
        let alive = unsafe { libc::kill(pid as i32, 0) } == 0;
        assert!(!alive, "recorder pid {pid} still exists after teardown");
    }

    #[tokio::test]
    async fn test_failed_run_keeps_artifact_path() {
        let dir = tempfile::tempdir().unwrap();
        let controller = CaptureController::new(test_config(dir.path()));

        let result = controller
            .with_capture("mock-0", "failing", async {
                run_result(Outcome::Failed("step 1: boom".to_string()))
            })
            .await;

        let artifact = result.capture_artifact.expect("artifact for failed run");
        assert!(artifact.file_name().unwrap().to_str().unwrap().starts_with("failing-"));
    }

    #[tokio::test]
    async fn test_passed_run_discards_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let controller = CaptureController::new(test_config(dir.path()));

        let result = controller
            .with_capture("mock-0", "passing", async { run_result(Outcome::Passed) })
            .await;

        assert!(result.capture_artifact.is_none());
    }

    #[tokio::test]
    async fn test_missing_recorder_degrades_to_no_capture() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.program = "definitely-not-a-real-recorder-binary".to_string();
        let controller = CaptureController::new(config);

        assert!(!controller.enabled());
        let result = controller
            .with_capture("mock-0", "no-recorder", async {
                run_result(Outcome::Failed("step 1: boom".to_string()))
            })
            .await;
        // Scenario still produced its result, just without an artifact
        assert!(result.capture_artifact.is_none());
    }

    #[tokio::test]
    async fn test_endpoint_serialization_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let controller = CaptureController::new(test_config(dir.path()));

        for _ in 0..2 {
            let result = controller
                .with_capture("mock-0", "serial", async { run_result(Outcome::Passed) })
                .await;
            assert!(result.outcome.passed());
        }
    }
}
