//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// A single rule the loaded configuration breaks.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigViolation {
    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("'camera.port' must be between 1 and 65535")]
    InvalidPort,

    #[error("Unsupported protocol '{0}' (supported: rtsp)")]
    UnsupportedProtocol(String),

    #[error("'camera.timeout' must be at least one second")]
    ZeroTimeout,

    #[error("'output.jpeg_quality' must be between 1 and 100 (got {0})")]
    JpegQualityOutOfRange(u8),

    #[error("Unknown log level '{0}' (expected trace, debug, info, warn or error)")]
    UnknownLogLevel(String),
}

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported config file format '{0}'. Use .json, .yml, or .yaml")]
    UnsupportedFormat(String),

    #[error("Error decoding JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error decoding YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Environment variable {var} has invalid value '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid configuration: {}", join_violations(.0))]
    Invalid(Vec<ConfigViolation>),
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
