//! Error types for configuration loading and tunnel discovery.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating `tunwatch.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("threshold must be a positive integer")]
    ZeroThreshold,

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("unknown restart policy: {0:?}")]
    UnknownRestartPolicy(String),

    #[error("unknown log format: {0:?}")]
    UnknownLogFormat(String),
}

/// Errors raised while building the tunnel registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to scan config directory {path}: {source}")]
    ScanDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read tunnel config {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no [Interface] Address in {0}")]
    MissingAddress(PathBuf),

    #[error("cannot derive gateway from address {0:?}")]
    InvalidAddress(String),
}
