//! # Regmirror Core
//!
//! Core types for mirroring container images into a local registry.
//!
//! This crate provides the pure, I/O-free building blocks used throughout the
//! regmirror workspace:
//!
//! - [`ImageReference`] - A validated `[registry[:port]/]repository/name[:tag]` string
//! - [`RegistryMap`] - Ordered upstream registry → replacement registry mapping
//! - [`ReferenceResolver`] - Computes the reference to pull and the reference to push
//!
//! ## Example
//!
//! ```rust
//! use regmirror_core::{ImageReference, ReferenceResolver, RegistryMap};
//!
//! let registries = RegistryMap::defaults().with_entry("docker.io", "mirror.example");
//! let resolver = ReferenceResolver::new(registries, "registry.local:9001");
//!
//! let image: ImageReference = "docker.io/library/nginx:1.25".parse().unwrap();
//! let resolved = resolver.resolve(&image);
//!
//! assert_eq!(resolved.pull, "mirror.example/library/nginx:1.25");
//! assert_eq!(resolved.push, "registry.local:9001/docker.io/library/nginx:1.25");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod reference;
pub mod registry_map;
pub mod resolver;


// Re-export main types at crate root
pub use error::{Error, Result};
pub use reference::{split_tag, ImageReference};
pub use registry_map::{RegistryMap, CATCH_ALL_REGISTRY, DEFAULT_REGISTRIES};
pub use resolver::{ReferenceResolver, ResolvedReference, DEFAULT_LOCAL_REGISTRY};
