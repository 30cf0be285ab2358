//! Error types for the core module.

use thiserror::Error;

use pgforge_iac::IacError;
use pgforge_playbook::PlaybookError;
use pgforge_spec::{SpecError, ValidationErrors};

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while generating artifacts.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The request was rejected; carries one reason per offending field.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Spec error: {0}")]
    Spec(SpecError),

    #[error(transparent)]
    Iac(#[from] IacError),

    #[error(transparent)]
    Playbook(#[from] PlaybookError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<SpecError> for CoreError {
    fn from(err: SpecError) -> Self {
        match err {
            SpecError::Validation(errors) => CoreError::Validation(errors),
            other => CoreError::Spec(other),
        }
    }
}

impl CoreError {
    /// Whether the caller's input was at fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    /// Whether a renderer broke its contract on a validated request.
    pub fn is_render(&self) -> bool {
        matches!(
            self,
            CoreError::Iac(IacError::Render(_))
                | CoreError::Playbook(PlaybookError::Render(_))
                | CoreError::Playbook(PlaybookError::Yaml(_))
        )
    }
}
