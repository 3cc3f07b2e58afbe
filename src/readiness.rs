//! Readiness sentinel matching.
//!
//! The supervised server advertises readiness only through its console
//! output, so startup detection is substring matching on log text. The
//! matching rule is deliberately isolated here so it can be swapped for a
//! structured health check without touching the supervisor state machine.

/// Completion phrase emitted by older builds of the server (Japanese UI).
const SENTINEL_PHRASE_JA: &str = "サーバーが起動しました";

/// Completion phrase emitted by newer builds, matched case-insensitively.
const SENTINEL_PHRASE_EN: &str = "server started";

/// Marker that counts as readiness when it co-occurs with the host:port.
const SENTINEL_MARKER: &str = "🚀";

/// Outcome of the bounded startup gate. Computed once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// A sentinel line was observed before the deadline.
    Ready,
    /// The child exited before emitting a sentinel.
    Failed,
    /// The deadline elapsed with the child still running but unready.
    TimedOut,
}

impl std::fmt::Display for StartupOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupOutcome::Ready => write!(f, "ready"),
            StartupOutcome::Failed => write!(f, "failed"),
            StartupOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Classify a single line of child output as a readiness sentinel or not.
///
/// `host_port` is the "localhost:3000" form of the service address; it must
/// co-occur with the rocket marker for that rule to fire.
pub fn is_ready_line(text: &str, host_port: &str) -> bool {
    if text.contains(SENTINEL_PHRASE_JA) {
        return true;
    }
    if text.to_lowercase().contains(SENTINEL_PHRASE_EN) {
        return true;
    }
    text.contains(SENTINEL_MARKER) && text.contains(host_port)
}
