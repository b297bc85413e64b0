//! Error types for ecrwatch-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling [`Config`](crate::config::Config) from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required variables were unset or empty.
    #[error("missing required environment variables: {}", names.join(", "))]
    Missing { names: Vec<&'static str> },

    #[error("PROJECT must look like `owner/name`, got '{value}'")]
    InvalidProject { value: String },

    #[error("ECR must be a registry repository without a tag, got '{value}'")]
    InvalidRegistry { value: String },

    #[error("{name} must be one of 1/0/true/false/yes/no, got '{value}'")]
    InvalidFlag { name: &'static str, value: String },

    #[error("failed to read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from reading or writing the last-built commit marker.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`MarkerError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> MarkerError {
    MarkerError::Io {
        path: path.into(),
        source,
    }
}
