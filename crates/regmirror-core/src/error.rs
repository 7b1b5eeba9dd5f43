//! Error types for regmirror core operations.
//!
//! This module defines the error types used throughout the `regmirror-core` crate.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in regmirror core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An image reference does not satisfy the reference grammar.
    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidReference {
        /// The offending reference.
        reference: String,
        /// Reason the reference was rejected.
        reason: String,
    },

    /// A registry map could not be built.
    #[error("Invalid registry map: {reason}")]
    InvalidRegistryMap {
        /// Reason the map was rejected.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
