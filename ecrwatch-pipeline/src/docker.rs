//! Process-backed image builder and registry client: `docker` for builds,
//! logins and pushes, `aws ecr get-login-password` for the credential.

use std::path::{Path, PathBuf};
use std::process::Command;

use secrecy::{ExposeSecret, SecretString};

use ecrwatch_core::ImageTag;

use crate::build::ImageBuilder;
use crate::command::{self, stdout_text};
use crate::error::CommandError;
use crate::publish::RegistryClient;

/// Username the registry expects alongside an `aws ecr get-login-password` token.
pub const ECR_USERNAME: &str = "AWS";

/// The `docker` command-line tool.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
}

impl DockerCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn docker(&self) -> Command {
        Command::new(&self.program)
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl ImageBuilder for DockerCli {
    fn build(&self, context: &Path, tags: &[ImageTag]) -> Result<(), CommandError> {
        let mut cmd = self.docker();
        cmd.current_dir(context).arg("build");
        for tag in tags {
            cmd.args(["-t", tag.as_str()]);
        }
        cmd.arg(".");
        command::run("docker build", &mut cmd)?;
        Ok(())
    }
}

/// [`RegistryClient`] for Amazon ECR: the AWS CLI issues the password, docker
/// logs in and pushes.
#[derive(Debug, Clone)]
pub struct EcrRegistry {
    aws: PathBuf,
    docker: DockerCli,
}

impl EcrRegistry {
    pub fn new(aws: impl Into<PathBuf>, docker: DockerCli) -> Self {
        Self {
            aws: aws.into(),
            docker,
        }
    }
}

impl Default for EcrRegistry {
    fn default() -> Self {
        Self::new("aws", DockerCli::default())
    }
}

impl RegistryClient for EcrRegistry {
    fn login_password(&self, region: &str) -> Result<SecretString, CommandError> {
        let mut cmd = Command::new(&self.aws);
        cmd.args(["ecr", "get-login-password", "--region", region]);
        let output = command::run("aws ecr get-login-password", &mut cmd)?;
        Ok(SecretString::from(stdout_text(&output)))
    }

    fn login(&self, host: &str, password: &SecretString) -> Result<(), CommandError> {
        let mut cmd = self.docker.docker();
        cmd.args(["login", "--username", ECR_USERNAME, "--password-stdin", host]);
        command::run_with_stdin("docker login", &mut cmd, password.expose_secret().as_bytes())?;
        Ok(())
    }

    fn push(&self, tag: &ImageTag) -> Result<(), CommandError> {
        let mut cmd = self.docker.docker();
        cmd.args(["push", tag.as_str()]);
        command::run("docker push", &mut cmd)?;
        Ok(())
    }
}
