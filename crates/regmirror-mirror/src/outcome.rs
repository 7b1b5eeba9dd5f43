//! Per-image outcomes and the aggregated batch result.

use std::time::Duration;

use chrono::{DateTime, Utc};
use regmirror_core::ImageReference;
use serde::{Serialize, Serializer};

use crate::error::{MirrorError, Result};

/// Final result of mirroring one image.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorOutcome {
    /// The reference as requested.
    pub image: ImageReference,

    /// Whether the image reached the local registry.
    pub success: bool,

    /// Attempts of the pull, tag, push sequence that were started.
    pub attempts: u32,

    /// Time spent on this image, including retry delays.
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,

    /// Last error, if the image failed.
    pub error: Option<String>,

    /// Reference that was pulled.
    pub pull: String,

    /// Reference that was pushed.
    pub push: String,
}

/// Result of a whole batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Unique run ID.
    pub run_id: String,

    /// When the batch started.
    pub started_at: DateTime<Utc>,

    /// Original references of failed images, in completion order.
    pub failed: Vec<ImageReference>,

    /// One outcome per requested image, in completion order.
    pub outcomes: Vec<MirrorOutcome>,

    /// Wall-clock time of the batch.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl BatchResult {
    /// Builds a result from outcomes collected in completion order.
    pub fn from_outcomes(
        run_id: impl Into<String>,
        started_at: DateTime<Utc>,
        outcomes: Vec<MirrorOutcome>,
        elapsed: Duration,
    ) -> Self {
        let failed = outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.image.clone())
            .collect();

        Self {
            run_id: run_id.into(),
            started_at,
            failed,
            outcomes,
            elapsed,
        }
    }

    /// Returns true if every image was mirrored.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of mirrored images.
    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed.len()
    }

    /// Converts a batch with failures into [`MirrorError::BatchFailed`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(MirrorError::BatchFailed {
                failed: self.failed.iter().map(ToString::to_string).collect(),
            })
        }
    }
}

fn as_millis<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(image: &str, success: bool) -> MirrorOutcome {
        MirrorOutcome {
            image: image.parse().unwrap(),
            success,
            attempts: 1,
            duration: Duration::from_millis(1500),
            error: (!success).then(|| "manifest unknown".to_string()),
            pull: image.to_string(),
            push: format!("registry.local:9001/{image}"),
        }
    }

    #[test]
    fn test_failed_keeps_completion_order() {
        let result = BatchResult::from_outcomes(
            "run-1",
            Utc::now(),
            vec![
                outcome("quay.io/b:1", false),
                outcome("docker.io/a:1", true),
                outcome("gcr.io/c:1", false),
            ],
            Duration::from_secs(3),
        );

        let failed: Vec<_> = result.failed.iter().map(ImageReference::as_str).collect();
        assert_eq!(failed, ["quay.io/b:1", "gcr.io/c:1"]);
        assert_eq!(result.succeeded(), 1);
        assert!(!result.is_success());
    }

    #[test]
    fn test_into_result() {
        let ok = BatchResult::from_outcomes(
            "run-2",
            Utc::now(),
            vec![outcome("docker.io/a:1", true)],
            Duration::ZERO,
        );
        assert!(ok.into_result().is_ok());

        let failed = BatchResult::from_outcomes(
            "run-3",
            Utc::now(),
            vec![outcome("docker.io/a:1", false)],
            Duration::ZERO,
        );
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.failed_images(), ["docker.io/a:1"]);
    }

    #[test]
    fn test_serialize_durations_as_millis() {
        let value = serde_json::to_value(outcome("docker.io/a:1", true)).unwrap();
        assert_eq!(value["duration_ms"], 1500);
        assert_eq!(value["image"], "docker.io/a:1");
        assert!(value["error"].is_null());
    }
}
