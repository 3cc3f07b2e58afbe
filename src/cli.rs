use clap::{Args, Parser, Subcommand};
use clap_complete::aot::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "devlaunch", version, about = "Local server launcher and supervisor")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Project directory containing package.json (defaults to the current
    /// directory)
    #[arg(short = 'd', long = "dir", global = true)]
    pub project_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start and supervise the server
    Start {
        /// Do not open the browser once the server is ready
        #[arg(long)]
        no_browser: bool,
    },
    /// Check that dependencies are installed
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
