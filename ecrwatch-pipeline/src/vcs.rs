//! Git access: commit identifiers of the working copy and the remote,
//! plus the clone / fetch / pull mutations the pipeline needs.

use std::path::{Path, PathBuf};
use std::process::Command;

use ecrwatch_core::{CommitId, RemoteUrl};

use crate::command::{self, stdout_text};
use crate::error::{VcsError, VcsOp};

/// Version-control capability used by the sync manager and the build pipeline.
///
/// None of these retry; a single failure is returned as-is.
pub trait VersionControl {
    /// Clone `branch` of `remote` into `dest`, which must not exist yet.
    fn clone_branch(&self, remote: &RemoteUrl, branch: &str, dest: &Path) -> Result<(), VcsError>;

    /// Update remote-tracking state for `branch`. Leaves the checked-out tree alone.
    fn fetch(&self, working_copy: &Path, branch: &str) -> Result<(), VcsError>;

    /// Bring the checked-out branch up to date with its upstream.
    fn pull(&self, working_copy: &Path) -> Result<(), VcsError>;

    /// Commit currently checked out at `working_copy`.
    fn local_head(&self, working_copy: &Path) -> Result<CommitId, VcsError>;

    /// Commit `branch` points at on `remote`, without a local copy.
    fn remote_head(&self, remote: &RemoteUrl, branch: &str) -> Result<CommitId, VcsError>;
}

/// [`VersionControl`] backed by the `git` command-line tool.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        // Never block on a credential prompt; a bad token must fail the run.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    fn in_dir(&self, working_copy: &Path) -> Command {
        let mut cmd = self.git();
        cmd.arg("-C").arg(working_copy);
        cmd
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl VersionControl for GitCli {
    fn clone_branch(&self, remote: &RemoteUrl, branch: &str, dest: &Path) -> Result<(), VcsError> {
        tracing::info!(remote = %remote, branch, dest = %dest.display(), "cloning");
        let url = remote.expose();
        let mut cmd = self.git();
        cmd.args(["clone", "--branch", branch, url.as_str()])
            .arg(dest);
        command::run("git clone", &mut cmd).map_err(VcsError::command(VcsOp::Clone))?;
        Ok(())
    }

    fn fetch(&self, working_copy: &Path, branch: &str) -> Result<(), VcsError> {
        let mut cmd = self.in_dir(working_copy);
        cmd.args(["fetch", "origin", branch]);
        command::run("git fetch", &mut cmd).map_err(VcsError::command(VcsOp::Fetch))?;
        Ok(())
    }

    fn pull(&self, working_copy: &Path) -> Result<(), VcsError> {
        let mut cmd = self.in_dir(working_copy);
        cmd.arg("pull");
        command::run("git pull", &mut cmd).map_err(VcsError::command(VcsOp::Pull))?;
        Ok(())
    }

    fn local_head(&self, working_copy: &Path) -> Result<CommitId, VcsError> {
        let mut cmd = self.in_dir(working_copy);
        cmd.args(["rev-parse", "HEAD"]);
        let output = command::run("git rev-parse", &mut cmd)
            .map_err(VcsError::command(VcsOp::RevParse))?;
        let head = stdout_text(&output);
        if head.is_empty() {
            return Err(VcsError::EmptyHead {
                path: working_copy.to_path_buf(),
            });
        }
        Ok(CommitId::from(head))
    }

    fn remote_head(&self, remote: &RemoteUrl, branch: &str) -> Result<CommitId, VcsError> {
        let url = remote.expose();
        let reference = format!("refs/heads/{branch}");
        let mut cmd = self.git();
        cmd.args(["ls-remote", url.as_str(), reference.as_str()]);
        let output = command::run("git ls-remote", &mut cmd)
            .map_err(VcsError::command(VcsOp::LsRemote))?;
        parse_ls_remote(&stdout_text(&output)).ok_or_else(|| VcsError::RefNotFound {
            branch: branch.to_string(),
        })
    }
}

/// First hash of `git ls-remote` output (`<hash>\t<ref>` per line).
pub fn parse_ls_remote(output: &str) -> Option<CommitId> {
    output.split_whitespace().next().map(CommitId::from)
}
