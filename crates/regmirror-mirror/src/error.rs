//! Error types for the mirror crate.

use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Errors that can occur while mirroring a batch.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// One or more images could not be mirrored.
    #[error("Failed to download images {failed:?}")]
    BatchFailed {
        /// Original references of the failed images, in completion order.
        failed: Vec<String>,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for invalidity.
        reason: String,
    },

    /// Reference or registry map error.
    #[error(transparent)]
    Core(#[from] regmirror_core::Error),
}

impl MirrorError {
    /// Returns the failed references if this is a batch failure.
    pub fn failed_images(&self) -> &[String] {
        match self {
            Self::BatchFailed { failed } => failed,
            _ => &[],
        }
    }
}
