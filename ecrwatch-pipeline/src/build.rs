//! Build pipeline: pull, build a dual-tagged image, advance the marker.
//!
//! Steps are hard gates in this order:
//!
//! 1. Pull the checked-out branch.
//! 2. Compute `<registry>:<timestamp>` and `<registry>:latest`.
//! 3. Build one image carrying both tags.
//! 4. Resolve the new local head and overwrite the marker with it.
//!
//! The marker is written last, so a failure in steps 1–3 leaves it unchanged.

use std::path::Path;

use serde::Serialize;

use ecrwatch_core::{marker, CommitId, ImageTag, RegistryRepo};

use crate::clock::{version_timestamp, Clock};
use crate::error::{BuildError, CommandError};
use crate::vcs::VersionControl;

/// Container image build capability.
pub trait ImageBuilder {
    /// Build the image described by the build descriptor in `context`, applying every tag.
    fn build(&self, context: &Path, tags: &[ImageTag]) -> Result<(), CommandError>;
}

/// A successfully built image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    /// `<registry>:<timestamp>`; unique per second.
    pub version_tag: ImageTag,
    /// `<registry>:latest`, same image as `version_tag`.
    pub alias_tag: ImageTag,
    /// Local head after the pull; now stored in the marker.
    pub commit: CommitId,
}

/// Run the build pipeline for `working_copy`, tagging under `registry`.
pub fn build(
    vcs: &dyn VersionControl,
    builder: &dyn ImageBuilder,
    clock: &dyn Clock,
    working_copy: &Path,
    registry: &RegistryRepo,
) -> Result<BuildResult, BuildError> {
    vcs.pull(working_copy).map_err(BuildError::Pull)?;

    let version_tag = registry.tag(&version_timestamp(clock.now()));
    let alias_tag = registry.alias();
    tracing::info!(stage = "build", tag = %version_tag, "building image");

    builder
        .build(working_copy, &[version_tag.clone(), alias_tag.clone()])
        .map_err(BuildError::Image)?;

    let commit = vcs.local_head(working_copy).map_err(BuildError::Head)?;
    marker::write_at(working_copy, &commit)?;
    tracing::info!(stage = "build", tag = %version_tag, commit = %commit, "image built");

    Ok(BuildResult {
        version_tag,
        alias_tag,
        commit,
    })
}
