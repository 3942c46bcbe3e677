//! Error types for the Arcana coordination core.
//!

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Coordinator is shutting down: {0}")]
    ShuttingDown(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ConfigurationError> for CoordinatorError {
    fn from(error: ConfigurationError) -> Self {
        CoordinatorError::ConfigurationError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
