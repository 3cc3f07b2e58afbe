use clap::{CommandFactory, Parser};
use clap_complete::aot::generate;
use devlaunch::cli::{Cli, Commands};
use devlaunch::launcher::Launcher;
use devlaunch::ui::summary::pause_before_exit;
use devlaunch::{commands, signal};

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with env-filter support.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let project_dir = cli
        .global
        .project_dir
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let result = match cli.command {
        Commands::Start { no_browser } => {
            let cancel = signal::install();
            let mut launcher = Launcher::new(project_dir, cancel, !no_browser);
            launcher.run().await
        }
        Commands::Doctor => {
            if let Err(e) = commands::doctor::run(&project_dir) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
            return;
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "devlaunch", &mut std::io::stdout());
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", anyhow::Error::from(e));
        // Keep the diagnostics on screen when run from a double-click or an
        // editor run button.
        pause_before_exit();
        std::process::exit(1);
    }
}
