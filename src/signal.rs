//! Converts interrupt/terminate signals into a single shutdown request.
//!
//! The handler does no work of its own: it only cancels the token, and the
//! terminate-with-timeout logic runs on the normal control flow. Repeated
//! signals before shutdown completes coalesce into the one cancellation.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Install the signal handlers. Returns the token the control loop should
/// select on; it is cancelled at most once, on the first signal received.
pub fn install() -> CancellationToken {
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown requested");
        token.cancel();
    });

    cancel
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => {
            // No SIGTERM stream; Ctrl-C alone still works.
            tokio::signal::ctrl_c().await.ok();
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_cancels_coalesce() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        cancel.cancel();
        assert!(cancel.is_cancelled());
        // cancelled() resolves immediately once cancelled, however often
        // the signal fired.
        cancel.cancelled().await;
    }
}
