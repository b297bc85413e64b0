//! Domain types for ecrwatch.
//!
//! Working-copy paths use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Identifiers that travel between components are newtypes so a commit hash can
//! never be passed where an image tag is expected.

use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed alias applied to every built image alongside its version tag.
pub const ALIAS_TAG: &str = "latest";

/// Branch watched when none is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Host used to build the authenticated clone URL when none is configured.
pub const DEFAULT_GIT_HOST: &str = "github.com";

const REDACTED: &str = "***";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A commit identifier as reported by the version-control tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CommitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A full image reference: `<registry repository>:<tag>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageTag(pub String);

impl ImageTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ImageTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ImageTag {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Repository identity
// ---------------------------------------------------------------------------

/// `owner/name` identifier of the watched source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    /// Parse `owner/name`. Exactly one `/`, both halves non-empty, and a name
    /// that is more than a bare `.git`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidProject {
            value: raw.to_string(),
        };
        let (owner, name) = raw.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        let slug = Self {
            owner: owner.to_string(),
            name: name.to_string(),
        };
        // An empty directory name would put the working copy at the workdir root.
        if slug.dir_name().is_empty() {
            return Err(invalid());
        }
        Ok(slug)
    }

    /// Directory name of the working copy: the repository name without `.git`.
    pub fn dir_name(&self) -> &str {
        self.name.strip_suffix(".git").unwrap_or(&self.name)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Registry repository that built images are tagged under and pushed to,
/// e.g. `123456789012.dkr.ecr.eu-west-1.amazonaws.com/app`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryRepo(String);

impl RegistryRepo {
    /// Validate a registry repository reference. It must not already carry a tag.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let value = raw.trim();
        let last_segment = value.rsplit('/').next().unwrap_or(value);
        if value.is_empty() || last_segment.is_empty() || last_segment.contains(':') {
            return Err(ConfigError::InvalidRegistry {
                value: raw.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Registry host the container tool must authenticate against.
    pub fn host(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// `<repository>:<tag>`
    pub fn tag(&self, tag: &str) -> ImageTag {
        ImageTag(format!("{}:{tag}", self.0))
    }

    /// `<repository>:latest`
    pub fn alias(&self) -> ImageTag {
        self.tag(ALIAS_TAG)
    }
}

impl fmt::Display for RegistryRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Token-bearing HTTPS URL used to clone, fetch and query the remote.
///
/// `Display` and `Debug` never show the token. Use [`RemoteUrl::expose`] only
/// when handing the URL to the version-control tool.
pub struct RemoteUrl {
    host: String,
    slug: RepoSlug,
    token: SecretString,
}

impl RemoteUrl {
    pub fn new(host: impl Into<String>, slug: RepoSlug, token: SecretString) -> Self {
        Self {
            host: host.into(),
            slug,
            token,
        }
    }

    /// `https://<token>@<host>/<owner>/<name>`
    pub fn expose(&self) -> String {
        format!(
            "https://{}@{}/{}",
            self.token.expose_secret(),
            self.host,
            self.slug
        )
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{REDACTED}@{}/{}", self.host, self.slug)
    }
}

impl fmt::Debug for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RemoteUrl").field(&self.to_string()).finish()
    }
}

// ---------------------------------------------------------------------------
// Watched repository
// ---------------------------------------------------------------------------

/// The repository, branch and local working copy one invocation operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedRepository {
    pub slug: RepoSlug,
    pub branch: String,
    pub working_copy: PathBuf,
}

impl WatchedRepository {
    /// Place the working copy for `slug` under `root`.
    pub fn under(root: &Path, slug: RepoSlug, branch: impl Into<String>) -> Self {
        let working_copy = root.join(slug.dir_name());
        Self {
            slug,
            branch: branch.into(),
            working_copy,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
