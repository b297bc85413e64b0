//! Error types for ecrwatch-pipeline.
//!
//! Each stage has its own error enum; [`PipelineError`] wraps them and names
//! the stage that failed.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use ecrwatch_core::{CommitId, ImageTag, MarkerError};

/// Failure of a single external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (missing binary, permissions).
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("`{command}` exited with {}: {detail}", exit_label(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        detail: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Version-control operations ecrwatch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsOp {
    Clone,
    Fetch,
    Pull,
    RevParse,
    LsRemote,
}

impl fmt::Display for VcsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsOp::Clone => write!(f, "clone"),
            VcsOp::Fetch => write!(f, "fetch"),
            VcsOp::Pull => write!(f, "pull"),
            VcsOp::RevParse => write!(f, "rev-parse"),
            VcsOp::LsRemote => write!(f, "ls-remote"),
        }
    }
}

/// A version-control query or mutation failed.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git {op} failed: {source}")]
    Command {
        op: VcsOp,
        #[source]
        source: CommandError,
    },

    #[error("no remote hash found for branch '{branch}'")]
    RefNotFound { branch: String },

    #[error("git rev-parse returned no commit for {path}")]
    EmptyHead { path: PathBuf },
}

impl VcsError {
    pub(crate) fn command(op: VcsOp) -> impl FnOnce(CommandError) -> VcsError {
        move |source| VcsError::Command { op, source }
    }
}

/// Errors from detecting whether a build is required.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Vcs(#[from] VcsError),

    #[error("marker error: {0}")]
    Marker(#[from] MarkerError),

    /// The directory that holds working copies could not be created.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the build pipeline. The marker is only written by the last step,
/// so every earlier variant leaves it untouched.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0}")]
    Pull(#[source] VcsError),

    #[error("image build failed: {0}")]
    Image(#[source] CommandError),

    #[error("{0}")]
    Head(#[source] VcsError),

    #[error("marker error: {0}")]
    Marker(#[from] MarkerError),
}

/// Errors from authenticating to the registry and pushing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to get registry login password: {0}")]
    Credential(#[source] CommandError),

    #[error("registry login failed: {0}")]
    Login(#[source] CommandError),

    #[error("push of {tag} failed: {source}")]
    Push {
        tag: ImageTag,
        #[source]
        source: CommandError,
    },
}

/// Stage of an invocation, used to name where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Sync,
    Build,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Sync => write!(f, "sync"),
            Stage::Build => write!(f, "build"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}

/// Any failure that ends an invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("sync stage failed: {0}")]
    Sync(#[from] SyncError),

    #[error("build stage failed: {0}")]
    Build(#[from] BuildError),

    /// The image was built and the marker advanced, but it never reached the registry.
    #[error(
        "publish stage failed for {version_tag} (marker already advanced to {commit}): {source}"
    )]
    Publish {
        version_tag: ImageTag,
        commit: CommitId,
        #[source]
        source: PublishError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Sync(_) => Stage::Sync,
            PipelineError::Build(_) => Stage::Build,
            PipelineError::Publish { .. } => Stage::Publish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_error_names_command_and_status() {
        let err = CommandError::Exit {
            command: "docker build".to_string(),
            code: Some(1),
            detail: "no Dockerfile".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`docker build` exited with status 1: no Dockerfile"
        );
    }

    #[test]
    fn stage_is_named_in_message() {
        let err = PipelineError::from(BuildError::Image(CommandError::Exit {
            command: "docker build".to_string(),
            code: None,
            detail: "killed".to_string(),
        }));
        assert_eq!(err.stage(), Stage::Build);
        assert!(err.to_string().starts_with("build stage failed"));
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn publish_error_reports_advanced_marker() {
        let err = PipelineError::Publish {
            version_tag: ImageTag::from("r/app:2024-01-01t000000"),
            commit: CommitId::from("def456"),
            source: PublishError::Push {
                tag: ImageTag::from("r/app:2024-01-01t000000"),
                source: CommandError::Exit {
                    command: "docker push".to_string(),
                    code: Some(1),
                    detail: "denied".to_string(),
                },
            },
        };
        assert_eq!(err.stage(), Stage::Publish);
        let msg = err.to_string();
        assert!(msg.contains("marker already advanced to def456"), "{msg}");
        assert!(msg.contains("denied"), "{msg}");
    }
}
