//! Invocation entrypoint shared by `ecrwatch run` and `ecrwatch check`.
//!
//! ```text
//! START → sync ─┬─ NO_BUILD
//!               └─ BUILD_REQUIRED → build → BUILT → publish → PUBLISHED
//! ```
//!
//! Every stage can end the invocation with a [`PipelineError`].

use serde::Serialize;

use ecrwatch_core::{CommitId, Config, ImageTag};

use crate::build::{self, BuildResult, ImageBuilder};
use crate::clock::{Clock, SystemClock};
use crate::docker::{DockerCli, EcrRegistry};
use crate::error::{PipelineError, SyncError};
use crate::publish::{self, AliasPolicy, RegistryClient};
use crate::sync::{self, Decision};
use crate::vcs::{GitCli, VersionControl};

/// How far an invocation goes once a build is known to be required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sync, build and publish.
    Full,
    /// Stop after the sync decision.
    DetectOnly,
}

/// Capabilities an invocation runs against.
#[derive(Clone, Copy)]
pub struct Tools<'a> {
    pub vcs: &'a dyn VersionControl,
    pub builder: &'a dyn ImageBuilder,
    pub registry: &'a dyn RegistryClient,
    pub clock: &'a dyn Clock,
}

/// Process-backed tools configured from [`ecrwatch_core::ToolPaths`].
#[derive(Debug, Clone)]
pub struct SystemTools {
    git: GitCli,
    docker: DockerCli,
    registry: EcrRegistry,
    clock: SystemClock,
}

impl SystemTools {
    pub fn from_config(config: &Config) -> Self {
        let docker = DockerCli::new(&config.tools.docker);
        Self {
            git: GitCli::new(&config.tools.git),
            registry: EcrRegistry::new(&config.tools.aws, docker.clone()),
            docker,
            clock: SystemClock,
        }
    }

    pub fn tools(&self) -> Tools<'_> {
        Tools {
            vcs: &self.git,
            builder: &self.docker,
            registry: &self.registry,
            clock: &self.clock,
        }
    }
}

/// Terminal success state of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The remote head was already built.
    NoBuild { commit: CommitId },
    /// A build is required; only returned in [`Mode::DetectOnly`].
    BuildRequired { decision: Decision },
    /// The image was built and its tags pushed.
    Published {
        build: BuildResult,
        pushed: Vec<ImageTag>,
    },
}

/// Run one invocation for the repository described by `config`.
pub fn run(config: &Config, tools: Tools<'_>, mode: Mode) -> Result<Outcome, PipelineError> {
    let repo = &config.repository;
    tracing::info!(
        repository = %repo.slug,
        branch = %repo.branch,
        working_copy = %repo.working_copy.display(),
        "starting"
    );

    // Cloning would seed the marker with the head nobody built yet.
    if mode == Mode::DetectOnly && !repo.working_copy.exists() {
        let remote = tools
            .vcs
            .remote_head(&config.remote, &repo.branch)
            .map_err(SyncError::from)?;
        tracing::info!(stage = "sync", remote = %remote, "no working copy, build required");
        return Ok(Outcome::BuildRequired {
            decision: Decision::Changed {
                stored: None,
                remote,
            },
        });
    }

    let report = sync::sync(tools.vcs, repo, &config.remote)?;
    let decision = report.decision;
    if let Decision::UpToDate { commit } = decision {
        return Ok(Outcome::NoBuild { commit });
    }
    if mode == Mode::DetectOnly {
        return Ok(Outcome::BuildRequired { decision });
    }

    let built = build::build(
        tools.vcs,
        tools.builder,
        tools.clock,
        &repo.working_copy,
        &config.registry,
    )?;

    let policy = AliasPolicy::from_flag(config.push_latest);
    let pushed = publish::publish(
        tools.registry,
        &config.registry,
        &built,
        &config.region,
        policy,
    )
    .map_err(|source| PipelineError::Publish {
        version_tag: built.version_tag.clone(),
        commit: built.commit.clone(),
        source,
    })?;

    Ok(Outcome::Published {
        build: built,
        pushed,
    })
}
