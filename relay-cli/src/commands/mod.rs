//! Commands module
//!
//! Defines the CLI commands and routes them to their handlers.

mod inspect;
mod matrix;
mod plan;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Find the action packages containing the given directories and plan their builds
    ///
    /// Directories are read one per line from stdin when none are given.
    Plan {
        /// Changed directories
        dirs: Vec<PathBuf>,
    },
    /// Print the expanded build matrix of one package
    Matrix {
        /// A relay.json file or a directory containing one
        path: PathBuf,
    },
    /// Gather build results the way a deploy step would and print them
    Inspect {
        /// Root the build jobs' artifacts were downloaded to
        #[arg(long, env = "ARTIFACTS_DIR")]
        artifacts_dir: Option<PathBuf>,

        /// Directory name prefix of this package's jobs
        #[arg(long, env = "CI_NAME")]
        prefix: Option<String>,

        /// Single build output to use instead of metadata directories
        #[arg(long, env = "BUILD_OUTPUT")]
        build_output: Option<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Plan { dirs } => plan::handle_plan_command(dirs).await,
        Commands::Matrix { path } => matrix::handle_matrix_command(&path).await,
        Commands::Inspect {
            artifacts_dir,
            prefix,
            build_output,
        } => inspect::handle_inspect_command(artifacts_dir, prefix, build_output).await,
    }
}
