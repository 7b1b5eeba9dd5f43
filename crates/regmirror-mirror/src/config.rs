//! Configuration types for the mirror orchestrator.
//!
//! This module provides the batch settings (local registry, registry map,
//! worker cap) and the per-image retry policy.

use std::time::Duration;

use regmirror_core::{ReferenceResolver, RegistryMap, DEFAULT_LOCAL_REGISTRY};

use crate::error::{MirrorError, Result};

/// Maximum number of images mirrored at the same time.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Attempts of the pull, tag, push sequence per image.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts after a transient failure.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(20);

/// Retry policy applied to each image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryConfig {
    /// Creates a configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }
}

/// Builder for `RetryConfig`.
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    max_attempts: Option<u32>,
    retry_delay: Option<Duration>,
}

impl RetryConfigBuilder {
    /// Sets the total number of attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the delay between attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
        }
    }
}

/// Configuration for one mirroring batch.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Local registry address (`host:port`) images are pushed to.
    pub local_registry: String,

    /// Upstream registry redirections.
    pub registries: RegistryMap,

    /// Upper bound on concurrently mirrored images.
    pub max_workers: usize,

    /// Per-image retry policy.
    pub retry: RetryConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            local_registry: DEFAULT_LOCAL_REGISTRY.to_string(),
            registries: RegistryMap::defaults(),
            max_workers: DEFAULT_MAX_WORKERS,
            retry: RetryConfig::default(),
        }
    }
}

impl MirrorConfig {
    /// Creates a configuration builder.
    pub fn builder() -> MirrorConfigBuilder {
        MirrorConfigBuilder::default()
    }

    /// Checks that the configuration can drive a batch.
    pub fn validate(&self) -> Result<()> {
        if self.local_registry.trim().is_empty() {
            return Err(MirrorError::InvalidConfig {
                reason: "local registry address is empty".to_string(),
            });
        }
        if self.local_registry.contains('/') {
            return Err(MirrorError::InvalidConfig {
                reason: format!(
                    "local registry '{}' must be a host[:port], not a path",
                    self.local_registry
                ),
            });
        }
        if self.max_workers == 0 {
            return Err(MirrorError::InvalidConfig {
                reason: "max_workers must be at least 1".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(MirrorError::InvalidConfig {
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Number of workers to start for a batch of `images` images.
    pub fn worker_count(&self, images: usize) -> usize {
        self.max_workers.min(images)
    }

    /// Builds the resolver this configuration describes.
    pub fn resolver(&self) -> ReferenceResolver {
        ReferenceResolver::new(self.registries.clone(), self.local_registry.clone())
    }
}

/// Builder for `MirrorConfig`.
#[derive(Debug, Default)]
pub struct MirrorConfigBuilder {
    local_registry: Option<String>,
    registries: Option<RegistryMap>,
    max_workers: Option<usize>,
    retry: Option<RetryConfig>,
}

impl MirrorConfigBuilder {
    /// Sets the local registry address.
    pub fn local_registry(mut self, address: impl Into<String>) -> Self {
        self.local_registry = Some(address.into());
        self
    }

    /// Sets the registry map.
    pub fn registries(mut self, registries: RegistryMap) -> Self {
        self.registries = Some(registries);
        self
    }

    /// Sets the worker cap.
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Sets the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> MirrorConfig {
        let defaults = MirrorConfig::default();
        MirrorConfig {
            local_registry: self.local_registry.unwrap_or(defaults.local_registry),
            registries: self.registries.unwrap_or(defaults.registries),
            max_workers: self.max_workers.unwrap_or(defaults.max_workers),
            retry: self.retry.unwrap_or(defaults.retry),
        }
    }
}
