//! Engine progress streams.
//!
//! Pull and push responses are streams of JSON objects, one per line. The
//! HTTP status is 200 as soon as the stream starts, so failures that happen
//! later only show up as an `error` field in one of the messages.

use serde::Deserialize;

use crate::error::RegistryError;

/// One message of an engine progress stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressMessage {
    /// Human-readable status line.
    #[serde(default)]
    pub status: Option<String>,

    /// Layer or tag the status refers to.
    #[serde(default)]
    pub id: Option<String>,

    /// Error summary.
    #[serde(default)]
    pub error: Option<String>,

    /// Structured error details.
    #[serde(default, rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
}

/// Structured error attached to a progress message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    /// Error message.
    #[serde(default)]
    pub message: Option<String>,
}

impl ProgressMessage {
    /// Returns the error text carried by this message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_detail
            .as_ref()
            .and_then(|d| d.message.as_deref())
            .or(self.error.as_deref())
    }
}

/// Scans a complete progress stream and returns the first reported error.
///
/// Lines that are not valid JSON are skipped; the engine only promises
/// line-delimited JSON, not that every chunk is well formed.
///
/// # Errors
///
/// Returns the classified error for the first message with an `error` field.
pub fn check_stream(reference: &str, body: &str) -> Result<(), RegistryError> {
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let message: ProgressMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::trace!(reference, error = %e, "skipping unparseable progress line");
                continue;
            }
        };

        if let Some(error) = message.error_message() {
            return Err(RegistryError::from_stream_message(reference, error.to_string()));
        }

        if let Some(status) = &message.status {
            tracing::trace!(reference, id = message.id.as_deref(), status = %status, "progress");
        }
    }
    Ok(())
}

/// Extracts the `message` field of an engine error body, falling back to the raw text.
#[must_use]
pub fn engine_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct EngineError {
        message: String,
    }

    serde_json::from_str::<EngineError>(body)
        .map_or_else(|_| body.trim().to_string(), |e| e.message)
}
