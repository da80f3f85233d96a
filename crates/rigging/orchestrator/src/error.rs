//! Orchestrator error types

use rigging_types::{OutputName, TypesError};
use std::path::PathBuf;
use thiserror::Error;

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No authenticated control-plane session; run `az login` and retry")]
    NotAuthenticated,

    #[error("Control plane {operation} failed: {message}")]
    ControlPlane { operation: String, message: String },

    #[error("Unresolvable dependency cycle between modules: {}", modules.join(", "))]
    UnresolvableCycle { modules: Vec<String> },

    #[error("Module {module} depends on unknown module {dependency}")]
    UnknownDependency { module: String, dependency: String },

    #[error("Duplicate module name: {0}")]
    DuplicateModule(String),

    #[error("Deployment failed: {reason}")]
    DeploymentFailed { reason: String },

    #[error("Deployment output missing: {0}")]
    MissingOutput(OutputName),

    #[error("Invalid deployment data: {0}")]
    InvalidData(#[source] TypesError),

    #[error("Deployment context not found in {} or its parent", searched.display())]
    ContextNotFound { searched: PathBuf },

    #[error("Deployment context mismatch: {0}")]
    ContextMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TypesError> for OrchestratorError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::MissingOutput(name) => OrchestratorError::MissingOutput(name),
            other => OrchestratorError::InvalidData(other),
        }
    }
}

/// Classes of failure that reach the caller.
///
/// Control-plane inconsistency never surfaces here: the executor resolves it
/// through reconciliation, and best-effort steps only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing identity or environment values; fix the setup, do not retry
    Configuration,
    /// Abort with a non-zero exit
    Terminal,
}

impl OrchestratorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            OrchestratorError::Configuration(_) | OrchestratorError::NotAuthenticated => {
                ErrorClass::Configuration
            }
            _ => ErrorClass::Terminal,
        }
    }

    /// Shorthand for control-plane failures
    pub fn control_plane(operation: impl Into<String>, message: impl Into<String>) -> Self {
        OrchestratorError::ControlPlane {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
