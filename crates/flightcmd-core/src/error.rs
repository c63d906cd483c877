//! Error types shared by the core components

use thiserror::Error;

/// Core component errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("History underflow: requested {requested} records, {available} available")]
    Underflow { requested: usize, available: usize },
    #[error("Numeric degradation: {0}")]
    NumericDegradation(String),
}

impl CoreError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
