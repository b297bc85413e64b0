//! # ecrwatch-pipeline
//!
//! Change detection and build orchestration.
//!
//! Call [`pipeline::run`] with a [`Config`](ecrwatch_core::Config) and a set of
//! [`Tools`] to sync the watched repository and, when its branch moved, build
//! and publish a new image. The stages are also usable on their own:
//! [`sync::sync`], [`build::build`], [`publish::publish`].

pub mod build;
pub mod clock;
mod command;
pub mod docker;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod sync;
pub mod vcs;

pub use build::{BuildResult, ImageBuilder};
pub use clock::{Clock, SystemClock};
pub use docker::{DockerCli, EcrRegistry};
pub use error::{
    BuildError, CommandError, PipelineError, PublishError, Stage, SyncError, VcsError, VcsOp,
};
pub use pipeline::{Mode, Outcome, SystemTools, Tools};
pub use publish::{AliasPolicy, RegistryClient};
pub use sync::{Decision, SyncReport};
pub use vcs::{GitCli, VersionControl};
