//! Error types for graph construction and configuration

use std::path::PathBuf;

use thiserror::Error;

/// Contract violations raised by [`crate::ProjectGraphBuilder`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown source project: {0}")]
    UnknownSourceProject(String),

    #[error("unknown target project: {0}")]
    UnknownTargetProject(String),

    #[error("file '{file}' does not belong to project '{project}'")]
    FileNotInProject { project: String, file: String },
}

/// Failures while reading the workspace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid workspace configuration: {0}")]
    Invalid(String),
}
