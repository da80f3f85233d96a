//! CLI error types

use rigging_orchestrator::RunFailure;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// A pipeline stopped at a named step
    #[error(transparent)]
    Run(#[from] RunFailure),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML rendering error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
