//! Error types for IaC rendering.

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while rendering Terraform.
///
/// None of these are caused by user input; a validated request always
/// renders. Seeing one means a caller broke the renderer's contract.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Terraform rendering failed: {0}")]
    Render(String),

    #[error("Invalid infra settings: {0}")]
    InvalidSettings(String),
}
