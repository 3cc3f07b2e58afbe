use anyhow::Result;
use std::path::Path;
use std::process::Command;

/// Environment report: tool versions plus the project files the launcher
/// will gate on. Informational only; never fails the process.
pub fn run(project_dir: &Path) -> Result<()> {
    println!("devlaunch doctor");
    println!("================");
    println!();

    let checks = [
        ("node", &["--version"] as &[&str]),
        ("npm", &["--version"]),
    ];

    let mut all_ok = true;

    for (name, args) in &checks {
        match Command::new(name).args(*args).output() {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                let version = version.trim();
                // Some tools output to stderr
                let version = if version.is_empty() {
                    String::from_utf8_lossy(&output.stderr).trim().to_string()
                } else {
                    version.to_string()
                };
                println!("  [ok] {:<16} {}", name, version);
            }
            _ => {
                println!("  [!!] {:<16} not found", name);
                all_ok = false;
            }
        }
    }

    println!();
    for file in ["package.json", ".env", "node_modules"] {
        if project_dir.join(file).exists() {
            println!("  [ok] {:<16} present", file);
        } else {
            println!("  [!!] {:<16} missing in {}", file, project_dir.display());
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("Ready to launch.");
    } else {
        println!("Some prerequisites are missing. `devlaunch start` will refuse to run.");
        println!("Note: node_modules is installed automatically if npm is available.");
    }

    Ok(())
}
