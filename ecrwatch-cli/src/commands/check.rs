//! `ecrwatch check` — detect phase only.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use ecrwatch_pipeline::{Decision, Mode, Outcome};

use super::{invoke, print_json, CommonArgs};

/// Arguments for `ecrwatch check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let config = self.common.prepare()?;
        let outcome = invoke(&config, Mode::DetectOnly)?;
        if self.common.json {
            return print_json(&config, &outcome);
        }

        match &outcome {
            Outcome::BuildRequired { decision } => {
                println!("{}: {}", "Build required".yellow(), reason(decision));
            }
            _ => println!("No build required"),
        }
        Ok(())
    }
}

fn reason(decision: &Decision) -> String {
    match decision {
        Decision::FreshClone { head } => format!("fresh clone at {head}"),
        Decision::Changed {
            stored: Some(stored),
            remote,
        } => format!("remote head {remote} differs from last built {stored}"),
        Decision::Changed {
            stored: None,
            remote,
        } => format!("remote head {remote} has never been built"),
        Decision::UpToDate { commit } => format!("up to date at {commit}"),
    }
}
