//! Best-effort browser opening. Failure is never fatal; the operator can
//! always open the URL by hand.

use tracing::{info, warn};

/// How a session opens the operator's browser once the server is ready.
pub enum BrowserOpener {
    /// Launch the platform opener for real.
    System,
    /// Never open anything; `--no-browser` runs.
    Disabled,
    /// Record requested URLs instead of opening anything.
    #[cfg(test)]
    Recording(std::sync::Arc<std::sync::Mutex<Vec<String>>>),
}

impl BrowserOpener {
    pub async fn open(&self, url: &str) {
        match self {
            BrowserOpener::System => open(url).await,
            BrowserOpener::Disabled => {}
            #[cfg(test)]
            BrowserOpener::Recording(urls) => urls.lock().unwrap().push(url.to_string()),
        }
    }
}

#[cfg(target_os = "macos")]
const OPENER: (&str, &[&str]) = ("open", &[]);
#[cfg(target_os = "windows")]
const OPENER: (&str, &[&str]) = ("cmd", &["/C", "start", ""]);
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER: (&str, &[&str]) = ("xdg-open", &[]);

/// Open the default browser at `url`. Logs a warning on failure.
pub async fn open(url: &str) {
    let (bin, args) = OPENER;
    let result = tokio::process::Command::new(bin)
        .args(args)
        .arg(url)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => info!(url, "opened browser"),
        Ok(status) => warn!(url, %status, "browser opener exited with failure; open the URL manually"),
        Err(e) => warn!(url, error = %e, "could not launch browser; open the URL manually"),
    }
}
