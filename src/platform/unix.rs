use tokio::process::Command;
use tracing::{debug, warn};

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

use crate::platform::PortListener;
use crate::session::SHUTDOWN_GRACE;

/// Return the user's default shell from `$SHELL`, falling back to `sh`.
fn user_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string())
}

pub fn shell_command(command: &str) -> Command {
    let shell = user_shell();
    let mut cmd = Command::new(&shell);
    // Login shell (-l) sources the user's profile/rc files so that
    // PATH and other environment customisations are available.
    cmd.arg("-l").arg("-c").arg(command);
    cmd
}

pub fn configure_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

pub async fn terminate_child(child: &mut tokio::process::Child, child_pid: Option<u32>) {
    if let Some(pid) = child_pid {
        let pgid = Pid::from_raw(pid as i32);
        match killpg(pgid, Signal::SIGTERM) {
            Ok(()) => {
                debug!(pid, "sent SIGTERM to process group");
            }
            Err(nix::errno::Errno::ESRCH) => {
                debug!(pid, "process group already exited");
                return;
            }
            Err(e) => {
                warn!(pid, error = %e, "killpg(SIGTERM) failed, falling back to kill");
                let _ = child.kill().await;
                return;
            }
        }

        let grace = tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await;
        match grace {
            Ok(Ok(_status)) => {
                debug!(pid, "child exited after SIGTERM");
            }
            _ => {
                warn!(pid, "child did not exit within {:?}, sending SIGKILL", SHUTDOWN_GRACE);
                let _ = child.kill().await;
                let _ = child.wait().await;
            }
        }
    } else {
        let _ = child.kill().await;
    }
}

pub fn force_kill(pid: u32) -> std::io::Result<()> {
    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).map_err(std::io::Error::from)
}

#[cfg(target_os = "linux")]
pub fn port_listeners(port: u16) -> Vec<PortListener> {
    let mut listeners = Vec::new();
    let port_hex = format!("{:04X}", port);

    // Collect socket inodes for every entry bound to the port, IPv4 and IPv6.
    let mut inodes: Vec<String> = Vec::new();
    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        let Ok(content) = std::fs::read_to_string(table) else {
            continue;
        };
        for line in content.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                continue;
            }
            if let Some(addr_port) = fields[1].split(':').nth(1) {
                if addr_port == port_hex && fields[9] != "0" {
                    inodes.push(fields[9].to_string());
                }
            }
        }
    }
    if inodes.is_empty() {
        return listeners;
    }

    // Walk /proc/<pid>/fd looking for the owning processes.
    let Ok(proc_dir) = std::fs::read_dir("/proc") else {
        return listeners;
    };
    for entry in proc_dir.flatten() {
        let pid_str = entry.file_name().to_string_lossy().to_string();
        if !pid_str.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let Ok(fds) = std::fs::read_dir(format!("/proc/{}/fd", pid_str)) else {
            continue;
        };
        let owns_socket = fds.flatten().any(|fd_entry| {
            std::fs::read_link(fd_entry.path()).is_ok_and(|link| {
                let link = link.to_string_lossy();
                inodes.iter().any(|i| link.contains(&format!("socket:[{}]", i)))
            })
        });
        if !owns_socket {
            continue;
        }
        let Ok(pid) = pid_str.parse::<u32>() else {
            continue;
        };
        let command = std::fs::read_to_string(format!("/proc/{}/cmdline", pid_str))
            .ok()
            .map(|c| c.replace('\0', " ").trim().to_string())
            .filter(|c| !c.is_empty());
        listeners.push(PortListener { pid, command });
    }

    listeners
}

#[cfg(not(target_os = "linux"))]
pub fn port_listeners(port: u16) -> Vec<PortListener> {
    // macOS and the BSDs have no /proc; shell out to lsof.
    let output = std::process::Command::new("lsof")
        .arg("-ti")
        .arg(format!(":{}", port))
        .arg("-sTCP:LISTEN")
        .output();
    let Ok(output) = output else {
        return Vec::new();
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|l| l.trim().parse::<u32>().ok())
        .map(|pid| PortListener { pid, command: None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn force_kill_reaped_process_errors() {
        // Spawn and reap a short-lived child; its PID no longer exists.
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(force_kill(pid).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn port_listeners_finds_our_own_listener() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let found = port_listeners(port);
        let me = std::process::id();
        assert!(
            found.iter().any(|l| l.pid == me),
            "expected own PID {} among listeners, got: {:?}",
            me,
            found,
        );
    }

    #[test]
    fn port_listeners_empty_for_free_port() {
        // Bind then drop to obtain a port that is (very likely) free.
        let port = {
            let l = TcpListener::bind(("127.0.0.1", 0)).unwrap();
            l.local_addr().unwrap().port()
        };
        assert!(port_listeners(port).is_empty());
    }
}
