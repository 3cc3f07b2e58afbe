use tokio::process::Command;
use tracing::{debug, warn};

use crate::platform::PortListener;
use crate::session::SHUTDOWN_GRACE;

pub fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd.exe");
    cmd.arg("/C").arg(command);
    cmd
}

pub fn configure_process_group(_cmd: &mut Command) {
    // Process-tree signalling is handled through taskkill /T instead.
}

pub async fn terminate_child(child: &mut tokio::process::Child, child_pid: Option<u32>) {
    if let Some(pid) = child_pid {
        // taskkill without /F is the closest thing to a graceful stop.
        let graceful = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T"])
            .output();
        if graceful.is_ok() {
            debug!(pid, "requested graceful stop via taskkill");
            if tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_ok() {
                return;
            }
            warn!(pid, "child did not exit within {:?}, forcing", SHUTDOWN_GRACE);
        }
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

pub fn force_kill(pid: u32) -> std::io::Result<()> {
    let status = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("taskkill exited with {}", status)))
    }
}

pub fn port_listeners(port: u16) -> Vec<PortListener> {
    // Parse `netstat -ano` for LISTENING sockets on the port.
    let Ok(output) = std::process::Command::new("netstat").arg("-ano").output() else {
        return Vec::new();
    };
    let needle = format!(":{}", port);
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| l.contains("LISTENING"))
        .filter(|l| {
            l.split_whitespace()
                .nth(1)
                .is_some_and(|addr| addr.ends_with(&needle))
        })
        .filter_map(|l| l.split_whitespace().last()?.parse::<u32>().ok())
        .map(|pid| PortListener { pid, command: None })
        .collect()
}
