//! Ownership of the one supervised child: spawn, bounded startup gate,
//! log relay, and graceful-then-forceful termination.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::platform;
use crate::readiness::{is_ready_line, StartupOutcome};
use crate::session::LaunchError;
use crate::ui::logs::{LogLine, LogSink};

/// Why the relay loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// A shutdown request arrived through the signal bridge.
    ShutdownRequested,
    /// The child exited on its own while being monitored.
    ChildExited(Option<i32>),
}

struct SupervisedChild {
    child: tokio::process::Child,
    pid: Option<u32>,
    lines: mpsc::Receiver<LogLine>,
    lines_open: bool,
}

/// Owns the spawn, handle, and exit status of exactly one child process.
pub struct ServerSupervisor {
    command: String,
    working_dir: PathBuf,
    child: Option<SupervisedChild>,
    last_exit: Option<ExitStatus>,
    #[cfg(test)]
    pub(crate) terminate_attempts: u32,
}

impl ServerSupervisor {
    pub fn new(command: impl Into<String>, working_dir: PathBuf) -> Self {
        Self {
            command: command.into(),
            working_dir,
            child: None,
            last_exit: None,
            #[cfg(test)]
            terminate_attempts: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Exit code of the most recently reaped child, if any.
    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit.and_then(|s| s.code())
    }

    /// Launch the server with stdout and stderr captured and merged into one
    /// line stream. Fails with [`LaunchError::AlreadyRunning`] if a child is
    /// already live, and with [`LaunchError::SpawnFailure`] if the launch
    /// call itself fails.
    pub fn spawn(&mut self) -> Result<(), LaunchError> {
        if self.child.is_some() {
            return Err(LaunchError::AlreadyRunning);
        }

        info!(command = %self.command, dir = %self.working_dir.display(), "spawning server");

        let mut cmd = platform::shell_command(&self.command);
        cmd.current_dir(&self.working_dir);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        platform::configure_process_group(&mut cmd);

        let mut child = cmd.spawn().map_err(LaunchError::SpawnFailure)?;
        let pid = child.id();
        debug!(pid = ?pid, "server spawned");

        let (tx, rx) = mpsc::channel::<LogLine>(1024);
        spawn_reader(child.stdout.take(), tx.clone(), false);
        spawn_reader(child.stderr.take(), tx, true);

        self.child = Some(SupervisedChild {
            child,
            pid,
            lines: rx,
            lines_open: true,
        });
        Ok(())
    }

    /// Consume the child's output until it proves ready, exits, or the
    /// deadline elapses. Exit detection wins over a sentinel observed in the
    /// same round. Non-sentinel lines are echoed through the sink.
    pub async fn await_ready(
        &mut self,
        host_port: &str,
        deadline: Duration,
        sink: &mut LogSink,
    ) -> StartupOutcome {
        let Some(sc) = self.child.as_mut() else {
            debug!("await_ready called with no live child");
            return StartupOutcome::Failed;
        };

        let last_exit = &mut self.last_exit;
        let gate = async {
            loop {
                tokio::select! {
                    biased;
                    status = sc.child.wait() => {
                        if let Ok(s) = status {
                            *last_exit = Some(s);
                        }
                        return StartupOutcome::Failed;
                    }
                    line = sc.lines.recv(), if sc.lines_open => match line {
                        Some(line) => {
                            let ready = is_ready_line(&line.text, host_port);
                            sink.write(&line);
                            if ready {
                                return StartupOutcome::Ready;
                            }
                        }
                        None => {
                            // Output closed; only the exit arm remains.
                            sc.lines_open = false;
                        }
                    },
                }
            }
        };

        match tokio::time::timeout(deadline, gate).await {
            Ok(outcome) => outcome,
            Err(_) => StartupOutcome::TimedOut,
        }
    }

    /// Echo child output until the child exits or shutdown is requested.
    /// Runs for the life of the session; there is no deadline here.
    pub async fn relay(&mut self, cancel: &CancellationToken, sink: &mut LogSink) -> RelayEnd {
        let Some(sc) = self.child.as_mut() else {
            debug!("relay called with no live child");
            return RelayEnd::ChildExited(self.last_exit.and_then(|s| s.code()));
        };

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return RelayEnd::ShutdownRequested;
                }
                status = sc.child.wait() => {
                    let code = status.as_ref().ok().and_then(|s| s.code());
                    if let Ok(s) = status {
                        self.last_exit = Some(s);
                    }
                    // Echo whatever the readers already buffered before EOF.
                    while let Ok(line) = sc.lines.try_recv() {
                        sink.write(&line);
                    }
                    return RelayEnd::ChildExited(code);
                }
                line = sc.lines.recv(), if sc.lines_open => match line {
                    Some(line) => sink.write(&line),
                    None => sc.lines_open = false,
                },
            }
        }
    }

    /// Send the graceful stop signal, escalate to a forceful kill after the
    /// grace window. Idempotent and a no-op when no child is running.
    pub async fn terminate(&mut self) {
        #[cfg(test)]
        {
            self.terminate_attempts += 1;
        }
        let Some(mut sc) = self.child.take() else {
            debug!("terminate called with no live child");
            return;
        };

        info!(pid = ?sc.pid, "stopping server");
        platform::terminate_child(&mut sc.child, sc.pid).await;
        if let Ok(Some(status)) = sc.child.try_wait() {
            self.last_exit = Some(status);
        }
        info!("server stopped");
    }
}

fn spawn_reader<R>(reader: Option<R>, tx: mpsc::Sender<LogLine>, is_stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(reader) = reader else { return };
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let text = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(LogLine::from_text(text, is_stderr)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    // Read transients are best-effort side paths.
                    warn!(error = %e, is_stderr, "output read error");
                    break;
                }
            }
        }
    });
}
