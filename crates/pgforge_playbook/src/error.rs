//! Error types for playbook rendering.

use thiserror::Error;

/// Result type alias for playbook operations.
pub type PlaybookResult<T> = Result<T, PlaybookError>;

/// Errors that can occur while rendering a playbook.
///
/// A validated request with checked settings always renders, so these point
/// at a bug rather than at bad input.
#[derive(Error, Debug)]
pub enum PlaybookError {
    #[error("Playbook rendering failed: {0}")]
    Render(String),

    #[error("Invalid playbook settings: {0}")]
    InvalidSettings(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
