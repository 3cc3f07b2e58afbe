//! Port reconciliation: force a known port into a free state before launch.
//!
//! This is best-effort by contract: listeners are killed and a fixed settle
//! time elapses, but the port is not re-verified afterward.

use std::net::TcpListener;

use tracing::{info, warn};

use crate::platform;
use crate::session::PORT_SETTLE;

pub fn check_port_available(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Reclaim `port` by force-terminating any process listening on it, then
/// waiting [`PORT_SETTLE`] for the OS to release the socket.
///
/// Idempotent: a free port is a no-op and returns immediately. Best-effort
/// throughout, so kill failures are logged rather than surfaced.
pub async fn reconcile(port: u16) {
    let listeners = platform::port_listeners(port);
    if listeners.is_empty() {
        if !check_port_available(port) {
            // Bound but the owner could not be identified (e.g. another
            // user's process). Nothing to kill; the spawn will surface the
            // conflict.
            warn!(port, "port is in use but no owning process was found");
        }
        return;
    }

    warn!(port, count = listeners.len(), "port is in use, stopping existing processes");
    for listener in &listeners {
        match platform::force_kill(listener.pid) {
            Ok(()) => info!(port, "killed {}", listener),
            Err(e) => warn!(port, pid = listener.pid, error = %e, "failed to kill listener"),
        }
    }

    tokio::time::sleep(PORT_SETTLE).await;
    info!(port, "port released");
}
