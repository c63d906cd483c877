//! Controller errors

use flightcmd_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the flight-command controller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("Malformed a priori info: {0}")]
    InfoFormat(#[from] serde_json::Error),
}

impl ControllerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// True for errors caused by invalid construction inputs
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::InfoFormat(_) | Self::Core(CoreError::Configuration(_))
        )
    }
}
