//! Regmirror Mirror Orchestrator
//!
//! This crate copies batches of container images into a local registry.
//!
//! # Overview
//!
//! For every requested image the orchestrator:
//! - **Resolves** the reference once: what to pull (possibly redirected to a
//!   private mirror) and where it lands in the local registry
//! - **Mirrors** it with pull → tag → push through an [`ImageClient`]
//! - **Retries** transient failures a fixed number of times with a fixed delay;
//!   a missing image or rejected credentials fail immediately
//! - **Reports** exactly one [`MirrorOutcome`] per image
//!
//! At most `min(max_workers, n)` images are in flight at any time.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────────────┐
//!            │   job queue (FIFO)   │
//!            └──────────┬───────────┘
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!  ┌──────────┐   ┌──────────┐   ┌──────────┐
//!  │ worker 1 │   │ worker 2 │   │ worker N │   N = min(5, images)
//!  └────┬─────┘   └────┬─────┘   └────┬─────┘
//!       └──────────────┼──────────────┘
//!                      ▼ mpsc
//!            ┌──────────────────────┐
//!            │      aggregator      │ → BatchResult
//!            └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use regmirror_mirror::{MirrorConfig, MirrorOrchestrator};
//! use regmirror_registry::MockImageClient;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator =
//!     MirrorOrchestrator::new(MirrorConfig::default(), Arc::new(MockImageClient::new()))?;
//!
//! let images = vec!["docker.io/library/nginx:1.25".parse()?];
//! let result = orchestrator.mirror_all(images).await;
//!
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! [`ImageClient`]: regmirror_registry::ImageClient

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::significant_drop_tightening)]

pub mod attempt;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod outcome;

// Re-export main types at crate root
pub use attempt::{AttemptFailure, ImageMirror, MirrorState, Step};
pub use config::{
    MirrorConfig, MirrorConfigBuilder, RetryConfig, RetryConfigBuilder, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_WORKERS, DEFAULT_RETRY_DELAY,
};
pub use error::{MirrorError, Result};
pub use orchestrator::MirrorOrchestrator;
pub use outcome::{BatchResult, MirrorOutcome};
