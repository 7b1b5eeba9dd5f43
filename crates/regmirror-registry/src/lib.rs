//! # Regmirror Registry
//!
//! Image client capability for the regmirror mirroring tool.
//!
//! The mirror moves images with three operations: pull from the source
//! registry, tag with the local name, push to the local registry. This crate
//! defines that capability as the [`ImageClient`] trait and ships two
//! implementations:
//!
//! - [`EngineClient`] talks to a container engine over its HTTP API
//!   (`/images/create`, `/images/{name}/tag`, `/images/{name}/push`).
//! - [`MockImageClient`] answers from per-reference scripts and records calls.
//!
//! ## Error classification
//!
//! Every failure is a [`RegistryError`]. Two kinds are permanent and must not
//! be retried: [`RegistryError::NotFound`] and
//! [`RegistryError::AuthenticationFailed`]. Everything else is transient
//! ([`RegistryError::is_retryable`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regmirror_registry::{EngineClient, EngineConfig, ImageClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EngineClient::new(EngineConfig::new("tcp://127.0.0.1:2375"))?;
//!
//!     client.pull("docker.io/library/nginx:1.25").await?;
//!     client
//!         .tag(
//!             "docker.io/library/nginx:1.25",
//!             "registry.local:9001/docker.io/library/nginx:1.25",
//!         )
//!         .await?;
//!     client
//!         .push("registry.local:9001/docker.io/library/nginx:1.25")
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod config;
mod error;
mod mock;
mod progress;

pub use client::{EngineClient, ImageClient};
pub use config::{
    registry_host, CredentialStore, EngineConfig, RegistryCredentials, DEFAULT_ENGINE_URL,
};
pub use error::RegistryError;
pub use mock::{MockCall, MockImageClient, MockResponse};
pub use progress::{check_stream, ErrorDetail, ProgressMessage};
