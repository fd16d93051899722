//! Error types for Timeshift.

use crate::frame::TextureHandle;
use thiserror::Error;

/// Main error type for Timeshift operations.
#[derive(Error, Debug)]
pub enum TimeshiftError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Shader compilation error: {0}")]
    Shader(String),

    #[error("GPU context lost")]
    ContextLost,

    #[error("Texture {0} is not checked out of the pool")]
    TextureNotCheckedOut(TextureHandle),

    #[error("Unknown texture: {0}")]
    UnknownTexture(TextureHandle),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Subtitle error: {0}")]
    Subtitle(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Timeshift operations.
pub type Result<T> = std::result::Result<T, TimeshiftError>;
