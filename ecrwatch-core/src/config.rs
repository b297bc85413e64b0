//! Invocation configuration.
//!
//! Built once at startup from environment variables and passed by reference to
//! every component. Nothing below the CLI reads the environment on its own.
//!
//! # API pattern
//!
//! - [`Config::from_lookup`] takes the variable source explicitly; tests use it
//!   with a `HashMap`.
//! - [`Config::from_env`] delegates to it with `std::env::var`.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::types::{
    RegistryRepo, RemoteUrl, RepoSlug, WatchedRepository, DEFAULT_BRANCH, DEFAULT_GIT_HOST,
};

pub const ENV_PROJECT: &str = "PROJECT";
pub const ENV_BRANCH: &str = "BRANCH";
pub const ENV_TOKEN: &str = "PAT_TOKEN";
pub const ENV_TOKEN_FILE: &str = "PAT_TOKEN_FILE";
pub const ENV_REGISTRY: &str = "ECR";
pub const ENV_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_GIT_HOST: &str = "GIT_HOST";
pub const ENV_PUSH_LATEST: &str = "PUSH_LATEST";
pub const ENV_GIT_BIN: &str = "GIT_BIN";
pub const ENV_DOCKER_BIN: &str = "DOCKER_BIN";
pub const ENV_AWS_BIN: &str = "AWS_BIN";

/// Default root directory holding working copies, relative to the current directory.
pub const DEFAULT_WORKDIR: &str = "repos";

/// Programs invoked for version control, image builds and registry credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub git: PathBuf,
    pub docker: PathBuf,
    pub aws: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            docker: PathBuf::from("docker"),
            aws: PathBuf::from("aws"),
        }
    }
}

/// Immutable settings for one invocation.
#[derive(Debug)]
pub struct Config {
    pub repository: WatchedRepository,
    pub remote: RemoteUrl,
    pub registry: RegistryRepo,
    pub region: String,
    /// Also push the `latest` alias after the version tag.
    pub push_latest: bool,
    pub tools: ToolPaths,
}

impl Config {
    /// Assemble a config from `std::env`, placing the working copy under `workdir`.
    pub fn from_env(workdir: &Path) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), workdir)
    }

    /// Assemble a config from an arbitrary variable source.
    ///
    /// Empty values count as unset. Every missing required variable is reported
    /// in a single [`ConfigError::Missing`].
    pub fn from_lookup<F>(lookup: F, workdir: &Path) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let project = get(ENV_PROJECT);
        // Token file errors wait until the missing-variable check has run.
        let token = match get(ENV_TOKEN) {
            Some(token) => Ok(Some(SecretString::from(token.trim().to_string()))),
            None => get(ENV_TOKEN_FILE)
                .map_or(Ok(None), |path| read_token_file(Path::new(path.trim()))),
        };
        let registry = get(ENV_REGISTRY);
        let region = get(ENV_REGION);

        let mut missing = Vec::new();
        if project.is_none() {
            missing.push(ENV_PROJECT);
        }
        if matches!(token, Ok(None)) {
            missing.push(ENV_TOKEN);
        }
        if registry.is_none() {
            missing.push(ENV_REGISTRY);
        }
        if region.is_none() {
            missing.push(ENV_REGION);
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing { names: missing });
        }
        let token = token?;
        let (Some(project), Some(token), Some(registry), Some(region)) =
            (project, token, registry, region)
        else {
            return Err(ConfigError::Missing { names: missing });
        };

        let slug = RepoSlug::parse(&project)?;
        let registry = RegistryRepo::parse(&registry)?;
        let branch = get(ENV_BRANCH).unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let host = get(ENV_GIT_HOST).unwrap_or_else(|| DEFAULT_GIT_HOST.to_string());
        let push_latest = match get(ENV_PUSH_LATEST) {
            Some(raw) => parse_flag(ENV_PUSH_LATEST, &raw)?,
            None => false,
        };

        let defaults = ToolPaths::default();
        let tools = ToolPaths {
            git: get(ENV_GIT_BIN).map(PathBuf::from).unwrap_or(defaults.git),
            docker: get(ENV_DOCKER_BIN)
                .map(PathBuf::from)
                .unwrap_or(defaults.docker),
            aws: get(ENV_AWS_BIN).map(PathBuf::from).unwrap_or(defaults.aws),
        };

        Ok(Self {
            repository: WatchedRepository::under(workdir, slug.clone(), branch.trim()),
            remote: RemoteUrl::new(host.trim(), slug, token),
            registry,
            region: region.trim().to_string(),
            push_latest,
            tools,
        })
    }
}

/// Token stored in `path`; an empty file counts as no token.
fn read_token_file(path: &Path) -> Result<Option<SecretString>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::TokenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let token = contents.trim();
    Ok((!token.is_empty()).then(|| SecretString::from(token.to_string())))
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}
