//! `ecrwatch run` — sync, then build and publish when the branch moved.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use ecrwatch_pipeline::{Mode, Outcome};

use super::{invoke, print_json, CommonArgs};

/// Arguments for `ecrwatch run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Also push the `latest` alias after the version tag. Overrides `PUSH_LATEST`.
    #[arg(long)]
    pub push_latest: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let mut config = self.common.prepare()?;
        if self.push_latest {
            config.push_latest = true;
        }

        let outcome = invoke(&config, Mode::Full)?;
        if self.common.json {
            return print_json(&config, &outcome);
        }

        match outcome {
            Outcome::NoBuild { .. } => println!("No build required"),
            Outcome::BuildRequired { .. } => println!("Build required"),
            Outcome::Published { build, pushed } => {
                println!("build result: {}", build.version_tag);
                for tag in &pushed {
                    println!("{} {tag}", "Successfully pushed".green());
                }
            }
        }
        Ok(())
    }
}
