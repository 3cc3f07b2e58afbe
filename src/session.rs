use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Port the supervised server binds. Reconciled before every launch.
pub const SERVICE_PORT: u16 = 3000;

/// URL handed to the browser and matched against readiness sentinels.
pub const SERVICE_URL: &str = "http://localhost:3000";

/// Maximum time from spawn to a readiness sentinel.
pub const STARTUP_DEADLINE: Duration = Duration::from_secs(30);

/// Grace period between the stop signal and the forceful kill on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Settle time after force-killing a previous listener on the port.
pub const PORT_SETTLE: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// SessionPhase: explicit state tracking for the supervision session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Init,
    CheckingDeps,
    ReconcilingPort,
    Spawning,
    AwaitingReady,
    Monitoring,
    /// Pre-spawn or startup failure; shutdown still runs if a child exists.
    Aborted { reason: String },
    Shutdown,
    Terminated,
}

// ---------------------------------------------------------------------------
// Session: run-scoped state, threaded explicitly (no globals)
// ---------------------------------------------------------------------------

/// One full run from dependency checking through shutdown. The launcher that
/// carries this record owns at most one child process at a time.
#[derive(Debug)]
pub struct Session {
    pub project_dir: PathBuf,
    pub port: u16,
    pub url: String,
    pub deadline: Duration,
    pub phase: SessionPhase,
}

impl Session {
    pub fn new(project_dir: PathBuf) -> Self {
        Self {
            project_dir,
            port: SERVICE_PORT,
            url: SERVICE_URL.to_string(),
            deadline: STARTUP_DEADLINE,
            phase: SessionPhase::Init,
        }
    }

    /// The "localhost:3000" form used by the sentinel co-occurrence rule.
    pub fn host_port(&self) -> String {
        format!("localhost:{}", self.port)
    }
}

// ---------------------------------------------------------------------------
// LaunchError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LaunchError {
    /// A dependency check failed before any process was spawned.
    #[error("prerequisite missing: {check}: {detail}")]
    PrerequisiteMissing { check: &'static str, detail: String },

    /// The auto-install step exited non-zero.
    #[error("package install failed: {0}")]
    InstallFailure(String),

    /// The launch call itself failed (e.g. command not found). Distinct from
    /// the child starting and then exiting.
    #[error("failed to spawn server process: {0}")]
    SpawnFailure(#[source] std::io::Error),

    /// A second spawn was attempted while a child is still live. The session
    /// owns at most one child at a time.
    #[error("a server process is already being supervised")]
    AlreadyRunning,

    /// The child exited before emitting a readiness sentinel.
    #[error("server exited before becoming ready{}", exit_detail(.0))]
    StartupFailed(Option<i32>),

    /// The deadline elapsed with the child still running but unready.
    #[error("server did not become ready within {0:?}")]
    StartupTimedOut(Duration),

    /// The child exited unexpectedly during the monitoring phase.
    #[error("server exited unexpectedly{}", exit_detail(.0))]
    RuntimeCrash(Option<i32>),
}

fn exit_detail(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" (exit code {})", c),
        None => " (killed by signal)".to_string(),
    }
}
