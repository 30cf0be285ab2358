//! Errors raised while turning a request into files on disk.

use std::path::PathBuf;

use thiserror::Error;

use pgforge_core::CoreError;

pub type HandlerResult<T> = Result<T, HandlerError>;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An artifact with the derived name already exists.
    #[error("Refusing to overwrite existing artifact: {}", .0.display())]
    Collision(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
