//! Ordered prerequisite checks run before anything is spawned.
//!
//! Fail-fast, not fail-safe: the first failing check aborts the run and no
//! later check executes. Partial environments are never silently tolerated.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::platform;
use crate::session::LaunchError;

/// Result of one prerequisite check, consumed in declaration order.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, passed: true, detail: detail.into() }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, passed: false, detail: detail.into() }
    }
}

/// Verifies the environment the server needs: runtime on PATH, manifest and
/// credential files in the project directory, and installed packages
/// (installing them if absent).
#[derive(Debug)]
pub struct DependencyGate {
    project_dir: PathBuf,
    /// Runtime binary probed with `--version`. Overridable for tests.
    runtime: String,
    /// Package manager used for the install step. Overridable for tests.
    package_manager: String,
}

impl DependencyGate {
    pub fn new(project_dir: PathBuf) -> Self {
        Self {
            project_dir,
            runtime: "node".to_string(),
            package_manager: "npm".to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_tools(mut self, runtime: &str, package_manager: &str) -> Self {
        self.runtime = runtime.to_string();
        self.package_manager = package_manager.to_string();
        self
    }

    /// Run all checks in order, logging each result. Returns the full list
    /// on success, or the first failure as a [`LaunchError`].
    pub async fn check_all(&self) -> Result<Vec<CheckResult>, LaunchError> {
        info!("checking dependencies");
        let mut results = Vec::new();

        // Strictly sequential: a failing check must abort before the next
        // one runs.
        Self::admit(self.check_runtime().await, &mut results)?;
        Self::admit(self.check_manifest().await, &mut results)?;
        Self::admit(self.check_credentials().await, &mut results)?;

        // The packages check can trigger a side effect (install), whose
        // failure is reported distinctly from a missing file.
        let result = self.check_packages().await?;
        info!(check = result.name, "{}", result.detail);
        results.push(result);

        Ok(results)
    }

    fn admit(result: CheckResult, results: &mut Vec<CheckResult>) -> Result<(), LaunchError> {
        if !result.passed {
            warn!(check = result.name, detail = %result.detail, "dependency check failed");
            return Err(LaunchError::PrerequisiteMissing {
                check: result.name,
                detail: result.detail,
            });
        }
        info!(check = result.name, "{}", result.detail);
        results.push(result);
        Ok(())
    }

    async fn check_runtime(&self) -> CheckResult {
        let output = platform::shell_command(&format!("{} --version", self.runtime))
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
                CheckResult::pass("runtime", format!("{} {}", self.runtime, version))
            }
            _ => CheckResult::fail(
                "runtime",
                format!("{} is not installed or not on PATH", self.runtime),
            ),
        }
    }

    async fn check_manifest(&self) -> CheckResult {
        if self.project_dir.join("package.json").exists() {
            CheckResult::pass("package.json", "manifest found")
        } else {
            CheckResult::fail(
                "package.json",
                format!("no package.json in {}", self.project_dir.display()),
            )
        }
    }

    async fn check_credentials(&self) -> CheckResult {
        if self.project_dir.join(".env").exists() {
            CheckResult::pass(".env", "credential file found")
        } else {
            CheckResult::fail(
                ".env",
                "credential file not found; configure your API credentials first",
            )
        }
    }

    async fn check_packages(&self) -> Result<CheckResult, LaunchError> {
        if self.project_dir.join("node_modules").exists() {
            return Ok(CheckResult::pass("node_modules", "packages installed"));
        }

        info!("node_modules missing, installing packages");
        let output = platform::shell_command(&format!("{} install", self.package_manager))
            .current_dir(&self.project_dir)
            .output()
            .await
            .map_err(|e| LaunchError::InstallFailure(e.to_string()))?;

        if output.status.success() {
            Ok(CheckResult::pass("node_modules", "packages installed"))
        } else {
            Err(LaunchError::InstallFailure(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for f in files {
            if f.ends_with('/') {
                std::fs::create_dir(dir.path().join(f.trim_end_matches('/'))).unwrap();
            } else {
                std::fs::write(dir.path().join(f), "{}").unwrap();
            }
        }
        dir
    }

    // `echo --version` always exits 0, making the runtime check pass without
    // requiring node in the test environment.
    fn gate(dir: &TempDir) -> DependencyGate {
        DependencyGate::new(dir.path().to_path_buf()).with_tools("echo", "true")
    }

    #[tokio::test]
    async fn all_checks_pass() {
        let dir = project_with(&["package.json", ".env", "node_modules/"]);
        let results = gate(&dir).check_all().await.unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.passed));
        let names: Vec<_> = results.iter().map(|r| r.name).collect();
        assert_eq!(names, ["runtime", "package.json", ".env", "node_modules"]);
    }

    #[tokio::test]
    async fn missing_runtime_fails_first() {
        let dir = project_with(&["package.json", ".env", "node_modules/"]);
        let gate = DependencyGate::new(dir.path().to_path_buf())
            .with_tools("definitely-not-a-real-binary-4721", "true");
        let err = gate.check_all().await.unwrap_err();
        assert!(
            matches!(err, LaunchError::PrerequisiteMissing { check: "runtime", .. }),
            "unexpected error: {err}",
        );
    }

    #[tokio::test]
    async fn missing_manifest_aborts_before_credentials() {
        // .env is also missing, but the manifest check runs first and must
        // be the one reported.
        let dir = project_with(&[]);
        let err = gate(&dir).check_all().await.unwrap_err();
        assert!(matches!(
            err,
            LaunchError::PrerequisiteMissing { check: "package.json", .. }
        ));
    }

    #[tokio::test]
    async fn missing_credentials_reported() {
        let dir = project_with(&["package.json", "node_modules/"]);
        let err = gate(&dir).check_all().await.unwrap_err();
        assert!(matches!(
            err,
            LaunchError::PrerequisiteMissing { check: ".env", .. }
        ));
    }

    #[tokio::test]
    async fn missing_packages_triggers_install() {
        let dir = project_with(&["package.json", ".env"]);
        // `true install` exits 0, standing in for a successful npm install.
        let results = gate(&dir).check_all().await.unwrap();
        assert!(results.iter().any(|r| r.name == "node_modules" && r.passed));
    }

    #[tokio::test]
    async fn failed_install_is_distinct_from_missing_file() {
        let dir = project_with(&["package.json", ".env"]);
        let gate = DependencyGate::new(dir.path().to_path_buf()).with_tools("echo", "false");
        let err = gate.check_all().await.unwrap_err();
        assert!(matches!(err, LaunchError::InstallFailure(_)), "unexpected error: {err}");
    }
}
