//! Scripted in-memory image client.
//!
//! [`MockImageClient`] answers pull, tag and push calls from per-reference
//! scripts, records every call, and tracks how many operations ran at the
//! same time. It backs the mirror's unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::client::ImageClient;
use crate::error::RegistryError;

/// A scripted answer to one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// The operation succeeds.
    Ok,
    /// The image does not exist.
    NotFound,
    /// Credentials are missing.
    Unauthorized,
    /// A transient failure with the given message.
    Transient(String),
}

impl MockResponse {
    fn into_result(self, reference: &str) -> Result<(), RegistryError> {
        match self {
            Self::Ok => Ok(()),
            Self::NotFound => Err(RegistryError::NotFound {
                reference: reference.to_string(),
                message: "manifest unknown".to_string(),
            }),
            Self::Unauthorized => Err(RegistryError::AuthenticationFailed {
                reference: reference.to_string(),
                message: "no basic auth credentials".to_string(),
            }),
            Self::Transient(message) => Err(RegistryError::Api {
                status: 500,
                message,
            }),
        }
    }
}

/// A call recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `pull(reference)`.
    Pull(String),
    /// `tag(source, target)`.
    Tag(String, String),
    /// `push(reference)`.
    Push(String),
}

#[derive(Debug)]
struct Script {
    queue: VecDeque<MockResponse>,
    fallback: MockResponse,
}

impl Script {
    fn next(&mut self) -> MockResponse {
        self.queue
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// In-memory [`ImageClient`] driven by scripts.
///
/// Operations without a script succeed.
#[derive(Debug, Default)]
pub struct MockImageClient {
    latency: Duration,
    pulls: Mutex<HashMap<String, Script>>,
    tags: Mutex<HashMap<String, Script>>,
    pushes: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(Instant, MockCall)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockImageClient {
    /// Creates a mock where every operation succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation take `latency` before answering.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answers pulls of `reference` with `responses` in order, then succeeds.
    #[must_use]
    pub fn script_pull(self, reference: &str, responses: Vec<MockResponse>) -> Self {
        Self::insert(&self.pulls, reference, responses, MockResponse::Ok);
        self
    }

    /// Answers every pull of `reference` with `response`.
    #[must_use]
    pub fn always_pull(self, reference: &str, response: MockResponse) -> Self {
        Self::insert(&self.pulls, reference, Vec::new(), response);
        self
    }

    /// Answers tags of `source` with `responses` in order, then succeeds.
    #[must_use]
    pub fn script_tag(self, source: &str, responses: Vec<MockResponse>) -> Self {
        Self::insert(&self.tags, source, responses, MockResponse::Ok);
        self
    }

    /// Answers pushes of `reference` with `responses` in order, then succeeds.
    #[must_use]
    pub fn script_push(self, reference: &str, responses: Vec<MockResponse>) -> Self {
        Self::insert(&self.pushes, reference, responses, MockResponse::Ok);
        self
    }

    /// Answers every push of `reference` with `response`.
    #[must_use]
    pub fn always_push(self, reference: &str, response: MockResponse) -> Self {
        Self::insert(&self.pushes, reference, Vec::new(), response);
        self
    }

    /// Returns every call made so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().iter().map(|(_, call)| call.clone()).collect()
    }

    /// Returns every call made so far with the instant it started.
    #[must_use]
    pub fn timed_calls(&self) -> Vec<(Instant, MockCall)> {
        self.calls.lock().clone()
    }

    /// Returns how many times `reference` was pulled.
    #[must_use]
    pub fn pull_count(&self, reference: &str) -> usize {
        self.count(|call| matches!(call, MockCall::Pull(r) if r == reference))
    }

    /// Returns how many times `reference` was pushed.
    #[must_use]
    pub fn push_count(&self, reference: &str) -> usize {
        self.count(|call| matches!(call, MockCall::Push(r) if r == reference))
    }

    /// Returns the highest number of operations that ran concurrently.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn insert(
        scripts: &Mutex<HashMap<String, Script>>,
        reference: &str,
        responses: Vec<MockResponse>,
        fallback: MockResponse,
    ) {
        scripts.lock().insert(
            reference.to_string(),
            Script {
                queue: responses.into(),
                fallback,
            },
        );
    }

    fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, call)| predicate(call))
            .count()
    }

    async fn answer(
        &self,
        call: MockCall,
        scripts: &Mutex<HashMap<String, Script>>,
        key: &str,
    ) -> Result<(), RegistryError> {
        self.calls.lock().push((Instant::now(), call));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let response = scripts
            .lock()
            .get_mut(key)
            .map_or(MockResponse::Ok, Script::next);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response.into_result(key)
    }
}

#[async_trait]
impl ImageClient for MockImageClient {
    async fn pull(&self, reference: &str) -> Result<(), RegistryError> {
        self.answer(MockCall::Pull(reference.to_string()), &self.pulls, reference)
            .await
    }

    async fn tag(&self, source: &str, target: &str) -> Result<(), RegistryError> {
        self.answer(
            MockCall::Tag(source.to_string(), target.to_string()),
            &self.tags,
            source,
        )
        .await
    }

    async fn push(&self, reference: &str) -> Result<(), RegistryError> {
        self.answer(MockCall::Push(reference.to_string()), &self.pushes, reference)
            .await
    }
}
