//! The session driver: runs the launch phases in order and guarantees the
//! child is terminated on every exit path that ever spawned one.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser::BrowserOpener;
use crate::deps::DependencyGate;
use crate::ports;
use crate::readiness::StartupOutcome;
use crate::session::{LaunchError, Session, SessionPhase};
use crate::supervisor::{RelayEnd, ServerSupervisor};
use crate::ui::logs::LogSink;
use crate::ui::summary::print_session_summary;

/// Fixed start command, resolved through the package manager's run-start
/// convention.
const START_COMMAND: &str = "npm start";

pub struct Launcher {
    session: Session,
    gate: DependencyGate,
    supervisor: ServerSupervisor,
    sink: LogSink,
    cancel: CancellationToken,
    opener: BrowserOpener,
}

impl Launcher {
    pub fn new(project_dir: PathBuf, cancel: CancellationToken, open_browser: bool) -> Self {
        let session = Session::new(project_dir.clone());
        let sink = LogSink::new(&project_dir.join(".devlaunch"));
        Self {
            gate: DependencyGate::new(project_dir.clone()),
            supervisor: ServerSupervisor::new(START_COMMAND, project_dir),
            sink,
            session,
            cancel,
            opener: if open_browser {
                BrowserOpener::System
            } else {
                BrowserOpener::Disabled
            },
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.session.phase
    }

    pub fn child_running(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Run one supervision session: dependency gate, port reconciliation,
    /// spawn, startup gate, then browser + log relay until shutdown.
    ///
    /// A signal arriving at any point after spawn takes the shutdown path;
    /// signal-driven shutdown is a success, not an error.
    pub async fn run(&mut self) -> Result<(), LaunchError> {
        self.session.phase = SessionPhase::CheckingDeps;
        if let Err(e) = self.gate.check_all().await {
            self.abort(e.to_string());
            return Err(e);
        }

        self.session.phase = SessionPhase::ReconcilingPort;
        ports::reconcile(self.session.port).await;

        if self.cancel.is_cancelled() {
            self.shutdown().await;
            return Ok(());
        }

        self.session.phase = SessionPhase::Spawning;
        if let Err(e) = self.supervisor.spawn() {
            self.abort(e.to_string());
            return Err(e);
        }

        self.session.phase = SessionPhase::AwaitingReady;
        info!(deadline = ?self.session.deadline, "waiting for the server to become ready");
        let cancel = self.cancel.clone();
        let host_port = self.session.host_port();
        let deadline = self.session.deadline;
        let gated = tokio::select! {
            _ = cancel.cancelled() => None,
            outcome = self.supervisor.await_ready(&host_port, deadline, &mut self.sink) => {
                Some(outcome)
            }
        };

        let Some(outcome) = gated else {
            self.shutdown().await;
            return Ok(());
        };

        match outcome {
            StartupOutcome::Ready => {}
            StartupOutcome::Failed => {
                let code = self.supervisor.last_exit_code();
                error!("server exited before becoming ready");
                self.session.phase = SessionPhase::Aborted {
                    reason: "startup failed".to_string(),
                };
                self.shutdown().await;
                return Err(LaunchError::StartupFailed(code));
            }
            StartupOutcome::TimedOut => {
                // A hung child is terminated rather than left running for
                // inspection: the port must be reclaimable on the next run.
                error!(deadline = ?deadline, "server startup timed out");
                self.session.phase = SessionPhase::Aborted {
                    reason: "startup timed out".to_string(),
                };
                self.shutdown().await;
                return Err(LaunchError::StartupTimedOut(deadline));
            }
        }

        info!(url = %self.session.url, "server is ready");
        self.opener.open(&self.session.url).await;
        print_session_summary(&self.session);

        self.session.phase = SessionPhase::Monitoring;
        let end = self.supervisor.relay(&cancel, &mut self.sink).await;
        let result = match end {
            RelayEnd::ShutdownRequested => {
                info!("stop requested");
                Ok(())
            }
            RelayEnd::ChildExited(code) => {
                warn!(code = ?code, "server process exited unexpectedly");
                Err(LaunchError::RuntimeCrash(code))
            }
        };

        self.shutdown().await;
        result
    }

    fn abort(&mut self, reason: String) {
        self.session.phase = SessionPhase::Aborted { reason };
    }

    /// Terminate any live child and mark the session done. Guarded so the
    /// shutdown sequence runs at most once per session.
    async fn shutdown(&mut self) {
        if matches!(
            self.session.phase,
            SessionPhase::Shutdown | SessionPhase::Terminated
        ) {
            return;
        }
        self.session.phase = SessionPhase::Shutdown;
        self.supervisor.terminate().await;
        self.session.phase = SessionPhase::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test_commands;
    use crate::session::SERVICE_URL;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    fn complete_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join(".env"), "").unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        dir
    }

    fn launcher(dir: &TempDir, command: &str) -> Launcher {
        let project_dir = dir.path().to_path_buf();
        let mut session = Session::new(project_dir.clone());
        // Reconcile an ephemeral port, not the real one: these tests must
        // never kill a server that happens to be using 3000.
        session.port = {
            let l = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
            l.local_addr().unwrap().port()
        };
        Launcher {
            gate: DependencyGate::new(project_dir.clone()).with_tools("echo", "true"),
            supervisor: ServerSupervisor::new(command, project_dir),
            sink: LogSink::discard(),
            session,
            cancel: CancellationToken::new(),
            opener: BrowserOpener::Disabled,
        }
    }

    #[tokio::test]
    async fn dependency_failure_aborts_before_spawn() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        // .env missing

        let mut launcher = launcher(&dir, test_commands::sleep_long());
        let err = launcher.run().await.unwrap_err();

        assert!(matches!(
            err,
            LaunchError::PrerequisiteMissing { check: ".env", .. }
        ));
        assert!(!launcher.child_running(), "spawn must never run after a gate failure");
        assert!(matches!(launcher.phase(), SessionPhase::Aborted { .. }));
    }

    #[tokio::test]
    async fn startup_failure_reports_exit_code_and_shuts_down() {
        let dir = complete_project();
        let mut launcher = launcher(&dir, test_commands::lines_then_exit_failure());

        let err = launcher.run().await.unwrap_err();
        assert!(matches!(err, LaunchError::StartupFailed(Some(1))));
        assert_eq!(launcher.phase(), &SessionPhase::Terminated);
        assert!(!launcher.child_running());
    }

    #[tokio::test]
    async fn startup_timeout_terminates_the_hung_child() {
        let dir = complete_project();
        let mut launcher = launcher(&dir, test_commands::sleep_long());
        launcher.session.deadline = Duration::from_millis(300);

        let err = launcher.run().await.unwrap_err();
        assert!(matches!(err, LaunchError::StartupTimedOut(_)));
        assert_eq!(launcher.phase(), &SessionPhase::Terminated);
        assert!(!launcher.child_running(), "hung child must not outlive the session");
    }

    #[tokio::test]
    async fn runtime_crash_is_reported_after_ready() {
        let dir = complete_project();
        #[cfg(unix)]
        let cmd = "echo 'server started' && sleep 1 && exit 3";
        #[cfg(windows)]
        let cmd = "echo server started&& ping -n 2 127.0.0.1 > nul&& exit /b 3";
        let mut launcher = launcher(&dir, cmd);

        let err = launcher.run().await.unwrap_err();
        assert!(matches!(err, LaunchError::RuntimeCrash(Some(3))), "got: {err}");
        assert_eq!(launcher.phase(), &SessionPhase::Terminated);
    }

    #[tokio::test]
    async fn signal_during_monitoring_is_a_clean_exit() {
        let dir = complete_project();
        let mut launcher = launcher(
            &dir,
            &test_commands::echo_then_sleep("server started"),
        );
        let cancel = launcher.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });

        launcher.run().await.unwrap();
        assert_eq!(launcher.phase(), &SessionPhase::Terminated);
        assert!(!launcher.child_running());
    }

    #[tokio::test]
    async fn signal_before_ready_is_a_clean_exit() {
        let dir = complete_project();
        let mut launcher = launcher(&dir, test_commands::sleep_long());
        let cancel = launcher.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });

        launcher.run().await.unwrap();
        assert_eq!(launcher.phase(), &SessionPhase::Terminated);
        assert!(!launcher.child_running());
    }

    #[tokio::test]
    async fn ready_path_opens_browser_at_service_url() {
        let dir = complete_project();
        let mut launcher = launcher(
            &dir,
            &test_commands::echo_then_sleep("server started"),
        );
        let opened = Arc::new(Mutex::new(Vec::new()));
        launcher.opener = BrowserOpener::Recording(opened.clone());

        let cancel = launcher.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });

        launcher.run().await.unwrap();
        assert_eq!(*opened.lock().unwrap(), vec![SERVICE_URL.to_string()]);
    }

    #[tokio::test]
    async fn startup_failure_never_opens_browser() {
        let dir = complete_project();
        let mut launcher = launcher(&dir, test_commands::lines_then_exit_failure());
        let opened = Arc::new(Mutex::new(Vec::new()));
        launcher.opener = BrowserOpener::Recording(opened.clone());

        launcher.run().await.unwrap_err();
        assert!(opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gate_failure_leaves_no_state_directory() {
        let dir = TempDir::new().unwrap(); // no package.json
        let state_dir = dir.path().join(".devlaunch");
        let mut launcher = launcher(&dir, test_commands::sleep_long());
        launcher.sink = LogSink::new(&state_dir);

        launcher.run().await.unwrap_err();
        assert!(
            !state_dir.exists(),
            "an aborted run must not leave a state directory behind"
        );
    }

    #[tokio::test]
    async fn shutdown_terminates_exactly_once_per_session() {
        let dir = complete_project();
        let mut launcher = launcher(
            &dir,
            &test_commands::echo_then_sleep("server started"),
        );
        let cancel = launcher.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });

        launcher.run().await.unwrap();
        assert_eq!(launcher.supervisor.terminate_attempts, 1);

        // A late re-entry, e.g. another cancellation arriving during
        // teardown, is a guarded no-op.
        launcher.shutdown().await;
        assert_eq!(launcher.supervisor.terminate_attempts, 1);
        assert_eq!(launcher.phase(), &SessionPhase::Terminated);
    }
}
