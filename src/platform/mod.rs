use tokio::process::Command;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as imp;
#[cfg(windows)]
use windows as imp;

/// A process found listening on a TCP port.
#[derive(Debug, Clone)]
pub struct PortListener {
    pub pid: u32,
    pub command: Option<String>,
}

impl std::fmt::Display for PortListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.command {
            Some(cmd) => write!(f, "{} (PID {})", cmd, self.pid),
            None => write!(f, "PID {}", self.pid),
        }
    }
}

/// Create a platform-appropriate shell command.
/// Unix: `$SHELL -l -c <command>`, Windows: `cmd.exe /C <command>`
pub fn shell_command(command: &str) -> Command {
    imp::shell_command(command)
}

/// Configure the command to run in a new process group so the whole tree
/// can be signalled at once.
pub fn configure_process_group(cmd: &mut Command) {
    imp::configure_process_group(cmd)
}

/// Gracefully terminate a child process and its descendants.
/// Sends a stop signal first, then forcefully kills after
/// [`crate::session::SHUTDOWN_GRACE`].
pub async fn terminate_child(child: &mut tokio::process::Child, child_pid: Option<u32>) {
    imp::terminate_child(child, child_pid).await
}

/// Enumerate processes currently listening on a local TCP port.
pub fn port_listeners(port: u16) -> Vec<PortListener> {
    imp::port_listeners(port)
}

/// Forcefully kill a process by PID (no graceful signal first).
pub fn force_kill(pid: u32) -> std::io::Result<()> {
    imp::force_kill(pid)
}
