//! Error types for the compositing pipeline

use std::path::PathBuf;
use thiserror::Error;

/// A configuration value that failed validation or could not be loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while building or evaluating a composite
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Raster(#[from] terraveg_core::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("raster source failed: {0}")]
    Source(String),

    #[error("node '{label}' evaluated to an unexpected type")]
    NodeType { label: &'static str },
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
