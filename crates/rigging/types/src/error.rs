//! Errors raised while building or validating core types

use crate::outputs::OutputName;
use thiserror::Error;

/// Type-level validation errors
#[derive(Debug, Error)]
pub enum TypesError {
    #[error("Deployment output missing: {0}")]
    MissingOutput(OutputName),

    #[error("Invalid GUID for {field}: {value}")]
    InvalidGuid { field: &'static str, value: String },

    #[error("Deployment context is invalid: {0}")]
    InvalidContext(String),
}

/// Result type for type-level operations
pub type Result<T> = std::result::Result<T, TypesError>;
