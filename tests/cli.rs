use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("devlaunch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn doctor_reports_missing_project_files() {
    let dir = tempfile::TempDir::new().unwrap();

    Command::cargo_bin("devlaunch")
        .unwrap()
        .args(["doctor", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("package.json"))
        .stdout(predicate::str::contains(".env"));
}

#[test]
fn start_fails_fast_on_empty_project() {
    let dir = tempfile::TempDir::new().unwrap();

    // stdin is not a terminal here, so the failure path must not block on
    // the press-Enter prompt.
    Command::cargo_bin("devlaunch")
        .unwrap()
        .args(["start", "--no-browser", "--dir"])
        .arg(dir.path())
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        // Either the runtime check or the package.json check fails first,
        // depending on whether node is on PATH; both are gate failures.
        .stderr(predicate::str::contains("prerequisite missing"));
}

#[test]
fn completions_generate_for_bash() {
    Command::cargo_bin("devlaunch")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("devlaunch"));
}
