//! Bounded worker pool over a batch of images.
//!
//! `min(max_workers, n)` tasks share one job queue. Each worker takes the next
//! resolved image, mirrors it to completion, sends the outcome to a single
//! aggregator and takes the next job until the queue is empty.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use regmirror_core::{ImageReference, ReferenceResolver, ResolvedReference};
use regmirror_registry::ImageClient;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::attempt::ImageMirror;
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::outcome::{BatchResult, MirrorOutcome};

/// Mirrors batches of images into the local registry.
pub struct MirrorOrchestrator {
    config: MirrorConfig,
    resolver: ReferenceResolver,
    client: Arc<dyn ImageClient>,
}

impl std::fmt::Debug for MirrorOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MirrorOrchestrator {
    /// Creates an orchestrator after validating `config`.
    pub fn new(config: MirrorConfig, client: Arc<dyn ImageClient>) -> Result<Self> {
        config.validate()?;
        let resolver = config.resolver();
        Ok(Self {
            config,
            resolver,
            client,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Returns the resolver built from the configuration.
    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Mirrors every image and returns one outcome per image.
    ///
    /// Outcomes and the failed list are in completion order. The batch
    /// failed if [`BatchResult::failed`] is non-empty.
    pub async fn mirror_all(&self, images: Vec<ImageReference>) -> BatchResult {
        let run_id = uuid::Uuid::now_v7().to_string();
        let started_at = Utc::now();
        let start = Instant::now();

        if images.is_empty() {
            tracing::info!(run_id = %run_id, "no images to mirror");
            return BatchResult::from_outcomes(run_id, started_at, Vec::new(), start.elapsed());
        }

        let total = images.len();
        let workers = self.config.worker_count(total);
        tracing::info!(
            run_id = %run_id,
            images = total,
            workers,
            local_registry = %self.config.local_registry,
            redirects = self.resolver.redirects(),
            "starting mirror batch"
        );

        let mut expected: HashMap<ImageReference, usize> = HashMap::new();
        for image in &images {
            *expected.entry(image.clone()).or_default() += 1;
        }

        let jobs: VecDeque<ResolvedReference> =
            images.iter().map(|image| self.resolver.resolve(image)).collect();
        let queue = Arc::new(Mutex::new(jobs));
        let (tx, mut rx) = mpsc::channel::<MirrorOutcome>(workers);

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                let mirror = ImageMirror::new(Arc::clone(&self.client), self.config.retry.clone());
                tokio::spawn(async move {
                    loop {
                        let next = queue.lock().pop_front();
                        let Some(job) = next else { break };
                        tracing::debug!(worker, image = %job.image, "worker picked image");
                        let outcome = mirror.run(job).await;
                        if tx.send(outcome).await.is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            if let Some(count) = expected.get_mut(&outcome.image) {
                *count = count.saturating_sub(1);
            }
            outcomes.push(outcome);
        }

        for (worker, result) in futures::future::join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = result {
                tracing::error!(run_id = %run_id, worker, error = %e, "mirror worker terminated abnormally");
            }
        }

        for (image, missing) in expected {
            for _ in 0..missing {
                tracing::error!(run_id = %run_id, image = %image, "no outcome recorded for image");
                outcomes.push(self.lost_outcome(&image));
            }
        }

        let result = BatchResult::from_outcomes(run_id, started_at, outcomes, start.elapsed());
        if result.is_success() {
            tracing::info!(
                run_id = %result.run_id,
                images = total,
                elapsed_secs = result.elapsed.as_secs_f64(),
                "mirror batch complete"
            );
        } else {
            tracing::warn!(
                run_id = %result.run_id,
                images = total,
                failed = result.failed.len(),
                elapsed_secs = result.elapsed.as_secs_f64(),
                "mirror batch finished with failures"
            );
        }
        result
    }

    fn lost_outcome(&self, image: &ImageReference) -> MirrorOutcome {
        let resolved = self.resolver.resolve(image);
        MirrorOutcome {
            image: resolved.image,
            success: false,
            attempts: 0,
            duration: std::time::Duration::ZERO,
            error: Some("worker terminated before producing an outcome".to_string()),
            pull: resolved.pull,
            push: resolved.push,
        }
    }
}
