//! ecrwatch core library: domain types, configuration, commit marker, errors.
//!
//! - [`types`]: newtypes and the watched repository
//! - [`config`]: [`Config`] assembled from the environment
//! - [`marker`]: read / write of the last-built commit marker
//! - [`error`]: [`ConfigError`], [`MarkerError`]

pub mod config;
pub mod error;
pub mod marker;
pub mod types;

pub use config::{Config, ToolPaths};
pub use error::{ConfigError, MarkerError};
pub use types::{
    CommitId, ImageTag, RegistryRepo, RemoteUrl, RepoSlug, WatchedRepository, ALIAS_TAG,
};
