//! Error types for image client operations.

use std::path::PathBuf;
use thiserror::Error;

/// Substrings in engine or registry messages that mean credentials are
/// missing or were rejected.
const AUTH_MARKERS: [&str; 4] = [
    "no basic auth credentials",
    "unauthorized",
    "authentication required",
    "denied",
];

/// Substrings in engine or registry messages that mean the image does not exist.
const NOT_FOUND_MARKERS: [&str; 3] = ["not found", "manifest unknown", "no such image"];

/// Errors that can occur during pull, tag and push operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to connect to the container engine.
    #[error("Failed to connect to engine at {url}: {source}")]
    ConnectionFailed {
        /// Engine URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The reference does not exist at its source.
    #[error("Image not found: {reference}: {message}")]
    NotFound {
        /// Image reference.
        reference: String,
        /// Message reported by the engine.
        message: String,
    },

    /// Credentials are missing or were rejected.
    #[error("Authentication failed for {reference}: {message}")]
    AuthenticationFailed {
        /// Image reference.
        reference: String,
        /// Message reported by the engine.
        message: String,
    },

    /// The engine answered with an unexpected HTTP status.
    #[error("Engine API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The engine reported an error inside a progress stream.
    #[error("Engine reported an error for {reference}: {message}")]
    Stream {
        /// Image reference.
        reference: String,
        /// Error message.
        message: String,
    },

    /// A request did not complete within the configured timeout.
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// Invalid engine URL.
    #[error("Invalid engine URL: {url}: {reason}")]
    InvalidUrl {
        /// URL string.
        url: String,
        /// Reason the URL was rejected.
        reason: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    Json {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    /// Classifies a non-success HTTP status returned for `reference`.
    #[must_use]
    pub fn from_status(status: u16, reference: &str, message: String) -> Self {
        match status {
            404 => Self::NotFound {
                reference: reference.to_string(),
                message,
            },
            401 | 403 => Self::AuthenticationFailed {
                reference: reference.to_string(),
                message,
            },
            _ if mentions_auth(&message) => Self::AuthenticationFailed {
                reference: reference.to_string(),
                message,
            },
            _ => Self::Api { status, message },
        }
    }

    /// Classifies an error message found in an engine progress stream.
    #[must_use]
    pub fn from_stream_message(reference: &str, message: String) -> Self {
        if mentions_auth(&message) {
            Self::AuthenticationFailed {
                reference: reference.to_string(),
                message,
            }
        } else if mentions_not_found(&message) {
            Self::NotFound {
                reference: reference.to_string(),
                message,
            }
        } else {
            Self::Stream {
                reference: reference.to_string(),
                message,
            }
        }
    }

    /// Returns true if the referenced image does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if credentials are missing or were rejected.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Returns true if repeating the operation could succeed.
    ///
    /// Everything except a missing image or an authentication failure is
    /// treated as transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !(self.is_not_found() || self.is_auth_failure())
    }
}

fn mentions_auth(message: &str) -> bool {
    let lower = message.to_lowercase();
    AUTH_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn mentions_not_found(message: &str) -> bool {
    let lower = message.to_lowercase();
    NOT_FOUND_MARKERS.iter().any(|marker| lower.contains(marker))
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        if err.is_timeout() {
            Self::Timeout { operation: url }
        } else if err.is_connect() {
            Self::ConnectionFailed { url, source: err }
        } else {
            Self::Api {
                status: err.status().map_or(0, |s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_404_is_not_found() {
        let err = RegistryError::from_status(404, "docker.io/foo:1", "manifest unknown".into());
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_status_401_is_auth_failure() {
        let err = RegistryError::from_status(401, "docker.io/foo:1", String::new());
        assert!(err.is_auth_failure());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_credentials_message_is_auth_failure() {
        let err = RegistryError::from_status(
            500,
            "registry.local:9001/docker.io/foo:1",
            "Get https://registry.local:9001/v2/: no basic auth credentials".into(),
        );
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_server_error_is_retryable() {
        let err = RegistryError::from_status(500, "docker.io/foo:1", "i/o timeout".into());
        assert!(matches!(err, RegistryError::Api { status: 500, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_stream_message_classification() {
        let auth = RegistryError::from_stream_message("r/a", "no basic auth credentials".into());
        assert!(auth.is_auth_failure());

        let missing = RegistryError::from_stream_message(
            "r/a",
            "manifest for r/a:9 not found: manifest unknown".into(),
        );
        assert!(missing.is_not_found());

        let other = RegistryError::from_stream_message("r/a", "unexpected EOF".into());
        assert!(matches!(other, RegistryError::Stream { .. }));
        assert!(other.is_retryable());
    }

    #[test]
    fn test_error_display_auth_failed() {
        let err = RegistryError::AuthenticationFailed {
            reference: "docker.io/foo:1".to_string(),
            message: "no basic auth credentials".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Authentication failed for docker.io/foo:1: no basic auth credentials"
        );
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = RegistryError::Timeout {
            operation: "pull".to_string(),
        };
        assert!(err.is_retryable());
    }
}
