//! Publish step: fetch a short-lived registry credential, log the container
//! tool in, push.

use secrecy::SecretString;
use serde::Serialize;

use ecrwatch_core::{ImageTag, RegistryRepo};

use crate::build::BuildResult;
use crate::error::{CommandError, PublishError};

/// Registry credential, authentication and push capability.
pub trait RegistryClient {
    /// Short-lived login password for the registry in `region`.
    fn login_password(&self, region: &str) -> Result<SecretString, CommandError>;

    /// Authenticate the local container tool against `host`.
    fn login(&self, host: &str, password: &SecretString) -> Result<(), CommandError>;

    /// Push a single tag.
    fn push(&self, tag: &ImageTag) -> Result<(), CommandError>;
}

/// Whether the `latest` alias reaches the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasPolicy {
    /// Push only the version tag; `latest` stays local.
    #[default]
    VersionOnly,
    /// Push the version tag, then the alias.
    WithAlias,
}

impl AliasPolicy {
    pub fn from_flag(push_latest: bool) -> Self {
        if push_latest {
            AliasPolicy::WithAlias
        } else {
            AliasPolicy::VersionOnly
        }
    }

    /// Tags to push for `build`, in push order.
    pub fn tags(self, build: &BuildResult) -> Vec<ImageTag> {
        match self {
            AliasPolicy::VersionOnly => vec![build.version_tag.clone()],
            AliasPolicy::WithAlias => vec![build.version_tag.clone(), build.alias_tag.clone()],
        }
    }
}

/// Authenticate to `registry` and push the tags `policy` selects for `build`.
///
/// Returns the pushed tags. Credential, login and each push are separate hard
/// failures; nothing is retried.
pub fn publish(
    client: &dyn RegistryClient,
    registry: &RegistryRepo,
    build: &BuildResult,
    region: &str,
    policy: AliasPolicy,
) -> Result<Vec<ImageTag>, PublishError> {
    let password = client
        .login_password(region)
        .map_err(PublishError::Credential)?;
    client
        .login(registry.host(), &password)
        .map_err(PublishError::Login)?;
    tracing::info!(stage = "publish", registry = registry.host(), "logged in");

    let tags = policy.tags(build);
    for tag in &tags {
        client.push(tag).map_err(|source| PublishError::Push {
            tag: tag.clone(),
            source,
        })?;
        tracing::info!(stage = "publish", tag = %tag, "pushed");
    }
    Ok(tags)
}
