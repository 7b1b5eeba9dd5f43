//! Per-image mirroring with retry.
//!
//! An image moves through `Pending → Attempting → {Succeeded, Retrying,
//! PermanentlyFailed}`. Each attempt runs the whole pull, tag, push sequence
//! against the references resolved once before the first attempt.

use std::fmt;
use std::sync::Arc;

use regmirror_core::ResolvedReference;
use regmirror_registry::{ImageClient, RegistryError};
use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::outcome::MirrorOutcome;

/// Step of the mirroring sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fetch from the source registry.
    Pull,
    /// Tag with the local name.
    Tag,
    /// Upload to the local registry.
    Push,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pull => "pull",
            Self::Tag => "tag",
            Self::Push => "push",
        })
    }
}

/// Why one attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The image does not exist at its source. Permanent.
    NotFound(String),
    /// Credentials are missing or were rejected. Permanent.
    AuthFailure(String),
    /// Anything else. Retried while attempts remain.
    Transient(String),
}

impl AttemptFailure {
    /// Classifies an error returned by `step`.
    pub fn classify(step: Step, err: &RegistryError) -> Self {
        let message = format!("{step} failed: {err}");
        if err.is_not_found() {
            Self::NotFound(message)
        } else if err.is_auth_failure() {
            Self::AuthFailure(message)
        } else {
            Self::Transient(message)
        }
    }

    /// Returns true if retrying cannot help.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Transient(_))
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m) | Self::AuthFailure(m) | Self::Transient(m) => m,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Lifecycle of one image within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// Not started.
    Pending,
    /// Running attempt number `attempt` (1-based).
    Attempting {
        /// Current attempt.
        attempt: u32,
    },
    /// Waiting out the delay after a transient failure of `attempt`.
    Retrying {
        /// Attempt that failed.
        attempt: u32,
    },
    /// The image is in the local registry.
    Succeeded,
    /// No further attempts will be made.
    PermanentlyFailed,
}

impl MirrorState {
    /// Returns true for `Succeeded` and `PermanentlyFailed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PermanentlyFailed)
    }
}

/// Mirrors single images through an [`ImageClient`].
#[derive(Clone)]
pub struct ImageMirror {
    client: Arc<dyn ImageClient>,
    retry: RetryConfig,
}

impl fmt::Debug for ImageMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageMirror")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ImageMirror {
    /// Creates a mirror using `client` and the given retry policy.
    pub fn new(client: Arc<dyn ImageClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Mirrors one image, retrying transient failures.
    ///
    /// Always returns an outcome; failures are data, not errors.
    pub async fn run(&self, resolved: ResolvedReference) -> MirrorOutcome {
        let start = Instant::now();
        let image = &resolved.image;
        let mut state = MirrorState::Pending;
        let mut attempts = 0;
        let mut last_failure: Option<AttemptFailure> = None;

        while attempts < self.retry.max_attempts {
            attempts += 1;
            transition(image, &mut state, MirrorState::Attempting { attempt: attempts });

            match self.attempt(&resolved).await {
                Ok(()) => {
                    transition(image, &mut state, MirrorState::Succeeded);
                    break;
                }
                Err(failure) => {
                    tracing::warn!(
                        image = %image,
                        attempt = attempts,
                        error = %failure,
                        "mirror attempt failed"
                    );
                    let permanent = failure.is_permanent();
                    last_failure = Some(failure);

                    if permanent || attempts >= self.retry.max_attempts {
                        break;
                    }

                    transition(image, &mut state, MirrorState::Retrying { attempt: attempts });
                    tracing::info!(
                        image = %image,
                        delay_secs = self.retry.retry_delay.as_secs_f64(),
                        "sleeping before retry"
                    );
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
            }
        }

        if !state.is_terminal() {
            transition(image, &mut state, MirrorState::PermanentlyFailed);
        }

        let success = state == MirrorState::Succeeded;
        let duration = start.elapsed();
        if success {
            tracing::info!(
                image = %image,
                pull = %resolved.pull,
                push = %resolved.push,
                attempts,
                duration_secs = duration.as_secs_f64(),
                "image mirrored"
            );
        } else {
            tracing::error!(image = %image, attempts, "image could not be mirrored");
        }

        MirrorOutcome {
            image: resolved.image.clone(),
            success,
            attempts,
            duration,
            error: if success {
                None
            } else {
                Some(
                    last_failure
                        .map_or_else(|| "no attempt was made".to_string(), |f| f.to_string()),
                )
            },
            pull: resolved.pull,
            push: resolved.push,
        }
    }

    async fn attempt(&self, resolved: &ResolvedReference) -> Result<(), AttemptFailure> {
        self.client
            .pull(&resolved.pull)
            .await
            .map_err(|e| AttemptFailure::classify(Step::Pull, &e))?;
        self.client
            .tag(&resolved.pull, &resolved.push)
            .await
            .map_err(|e| AttemptFailure::classify(Step::Tag, &e))?;
        self.client
            .push(&resolved.push)
            .await
            .map_err(|e| AttemptFailure::classify(Step::Push, &e))?;
        Ok(())
    }
}

fn transition(image: &regmirror_core::ImageReference, state: &mut MirrorState, next: MirrorState) {
    tracing::trace!(image = %image, from = ?state, to = ?next, "state transition");
    *state = next;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use regmirror_core::{ImageReference, ReferenceResolver, RegistryMap};
    use regmirror_registry::{MockCall, MockImageClient, MockResponse};

    use super::*;

    fn resolve(image: &str) -> ResolvedReference {
        let resolver = ReferenceResolver::new(RegistryMap::defaults(), "registry.local:9001");
        resolver.resolve(&ImageReference::parse(image).unwrap())
    }

    fn mirror(client: &Arc<MockImageClient>) -> ImageMirror {
        ImageMirror::new(client.clone(), RetryConfig::default())
    }

    #[test]
    fn test_classify() {
        let not_found = RegistryError::NotFound {
            reference: "docker.io/a:1".into(),
            message: "manifest unknown".into(),
        };
        let failure = AttemptFailure::classify(Step::Pull, &not_found);
        assert!(matches!(failure, AttemptFailure::NotFound(_)));
        assert!(failure.is_permanent());
        assert!(failure.message().starts_with("pull failed: "));

        let transient = RegistryError::Api {
            status: 500,
            message: "boom".into(),
        };
        let failure = AttemptFailure::classify(Step::Push, &transient);
        assert!(matches!(failure, AttemptFailure::Transient(_)));
        assert!(!failure.is_permanent());
    }

    #[test]
    fn test_terminal_states() {
        assert!(MirrorState::Succeeded.is_terminal());
        assert!(MirrorState::PermanentlyFailed.is_terminal());
        assert!(!MirrorState::Pending.is_terminal());
        assert!(!MirrorState::Retrying { attempt: 1 }.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_runs_pull_tag_push() {
        let client = Arc::new(MockImageClient::new());
        let outcome = mirror(&client).run(resolve("docker.io/foo:1")).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.is_none());
        assert_eq!(
            client.calls(),
            vec![
                MockCall::Pull("docker.io/foo:1".into()),
                MockCall::Tag(
                    "docker.io/foo:1".into(),
                    "registry.local:9001/docker.io/foo:1".into()
                ),
                MockCall::Push("registry.local:9001/docker.io/foo:1".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_exhausts_attempts() {
        let client = Arc::new(
            MockImageClient::new()
                .always_pull("docker.io/foo:1", MockResponse::Transient("i/o timeout".into())),
        );
        let outcome = mirror(&client).run(resolve("docker.io/foo:1")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(client.pull_count("docker.io/foo:1"), 3);
        assert!(outcome.duration >= Duration::from_secs(40));
        assert!(outcome.duration < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_stops_after_one_attempt() {
        let client =
            Arc::new(MockImageClient::new().always_pull("docker.io/foo:9", MockResponse::NotFound));
        let outcome = mirror(&client).run(resolve("docker.io/foo:9")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(client.pull_count("docker.io/foo:9"), 1);
        assert!(outcome.duration < Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_on_push_stops_after_one_attempt() {
        let client = Arc::new(MockImageClient::new().always_push(
            "registry.local:9001/docker.io/foo:1",
            MockResponse::Unauthorized,
        ));
        let outcome = mirror(&client).run(resolve("docker.io/foo:1")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.unwrap().starts_with("push failed: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_reruns_whole_sequence() {
        let client = Arc::new(MockImageClient::new().script_push(
            "registry.local:9001/docker.io/foo:1",
            vec![MockResponse::Transient("connection reset".into())],
        ));
        let outcome = mirror(&client).run(resolve("docker.io/foo:1")).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(client.pull_count("docker.io/foo:1"), 2);
        assert_eq!(client.push_count("registry.local:9001/docker.io/foo:1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_last_attempt() {
        let client = Arc::new(MockImageClient::new().script_pull(
            "docker.io/foo:1",
            vec![
                MockResponse::Transient("503".into()),
                MockResponse::Transient("503".into()),
            ],
        ));
        let outcome = mirror(&client).run(resolve("docker.io/foo:1")).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
    }
}
