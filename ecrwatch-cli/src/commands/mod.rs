pub mod check;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use ecrwatch_core::{config::DEFAULT_WORKDIR, Config};
use ecrwatch_pipeline::{pipeline, Mode, Outcome, SystemTools};

use crate::logging::{self, LogFormat};

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Directory that holds working copies.
    #[arg(long, default_value = DEFAULT_WORKDIR)]
    pub workdir: PathBuf,

    /// Emit machine-readable JSON instead of status lines.
    #[arg(long)]
    pub json: bool,

    /// Format of the log lines written to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl CommonArgs {
    /// Install logging and load the configuration from the environment.
    pub fn prepare(&self) -> Result<Config> {
        logging::init(self.log_format);
        let config = Config::from_env(&self.workdir).context("invalid configuration")?;
        Ok(config)
    }
}

/// Run one invocation with process-backed tools, logging the failed stage.
pub fn invoke(config: &Config, mode: Mode) -> Result<Outcome> {
    let system = SystemTools::from_config(config);
    pipeline::run(config, system.tools(), mode)
        .inspect_err(|err| {
            tracing::error!(stage = %err.stage(), error = %err, "invocation failed");
        })
        .with_context(|| format!("ecrwatch failed for {}", config.repository.slug))
}

#[derive(Serialize)]
struct RunReport<'a> {
    repository: String,
    branch: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

pub fn print_json(config: &Config, outcome: &Outcome) -> Result<()> {
    let report = RunReport {
        repository: config.repository.slug.to_string(),
        branch: &config.repository.branch,
        outcome,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize report JSON")?
    );
    Ok(())
}
