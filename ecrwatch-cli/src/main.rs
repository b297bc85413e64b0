//! ecrwatch — rebuild and push a container image when a watched branch moves.
//!
//! # Usage
//!
//! ```text
//! ecrwatch run   [--workdir <dir>] [--push-latest] [--json] [--log-format text|json]
//! ecrwatch check [--workdir <dir>] [--json] [--log-format text|json]
//! ```
//!
//! Repository, registry and credentials come from the environment
//! (`PROJECT`, `BRANCH`, `PAT_TOKEN`, `ECR`, `AWS_DEFAULT_REGION`).

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ecrwatch",
    version,
    about = "Build and push a container image when a watched branch gets a new commit",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync the working copy and, if the branch moved, build and push an image.
    Run(RunArgs),

    /// Report whether a build is required without building or pushing.
    Check(CheckArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Check(args) => args.run(),
    }
}
