//! Sync manager: make sure the working copy exists and decide whether a build
//! is required.
//!
//! Decision precedence:
//! 1. `FreshClone` (working copy did not exist; always builds)
//! 2. `Changed` (remote head differs from the stored marker, or no marker)
//! 3. `UpToDate`
//!
//! An existing working copy is only fetched, never checked out; the build
//! pipeline's pull is what moves the tree to the new commit.

use serde::Serialize;

use ecrwatch_core::{marker, CommitId, RemoteUrl, WatchedRepository};

use crate::error::SyncError;
use crate::vcs::VersionControl;

/// Why a build is or is not required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// The working copy was just cloned at `head`.
    FreshClone { head: CommitId },
    /// The remote moved past the last built commit.
    Changed {
        stored: Option<CommitId>,
        remote: CommitId,
    },
    /// The remote head is the commit that was last built.
    UpToDate { commit: CommitId },
}

impl Decision {
    /// Compare the remote head with the stored marker. A missing marker never matches.
    pub fn compare(stored: Option<CommitId>, remote: CommitId) -> Self {
        if stored.as_ref() == Some(&remote) {
            Decision::UpToDate { commit: remote }
        } else {
            Decision::Changed { stored, remote }
        }
    }

    pub fn build_required(&self) -> bool {
        !matches!(self, Decision::UpToDate { .. })
    }
}

/// Outcome of [`sync`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub working_copy_ready: bool,
    pub build_required: bool,
    pub decision: Decision,
}

impl From<Decision> for SyncReport {
    fn from(decision: Decision) -> Self {
        Self {
            working_copy_ready: true,
            build_required: decision.build_required(),
            decision,
        }
    }
}

/// Clone or fetch `repo` and decide whether it needs a build.
///
/// Any version-control or marker failure aborts without touching the marker,
/// except on a fresh clone where the initial marker is the cloned head.
pub fn sync(
    vcs: &dyn VersionControl,
    repo: &WatchedRepository,
    remote: &RemoteUrl,
) -> Result<SyncReport, SyncError> {
    let working_copy = &repo.working_copy;

    if !working_copy.exists() {
        if let Some(parent) = working_copy.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SyncError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        vcs.clone_branch(remote, &repo.branch, working_copy)?;
        let head = vcs.local_head(working_copy)?;
        marker::write_at(working_copy, &head)?;
        tracing::info!(stage = "sync", commit = %head, "fresh clone, build required");
        return Ok(Decision::FreshClone { head }.into());
    }

    vcs.fetch(working_copy, &repo.branch)?;
    let remote_head = vcs.remote_head(remote, &repo.branch)?;
    let stored = marker::read_at(working_copy)?;

    let decision = Decision::compare(stored, remote_head);
    match &decision {
        Decision::Changed { stored, remote } => tracing::info!(
            stage = "sync",
            stored = stored.as_ref().map(CommitId::as_str).unwrap_or("<none>"),
            remote = %remote,
            "new commit detected, build required"
        ),
        Decision::UpToDate { commit } => {
            tracing::info!(stage = "sync", commit = %commit, "no build required")
        }
        Decision::FreshClone { .. } => {}
    }
    Ok(decision.into())
}
