//! Reference resolution.
//!
//! Decides, for each requested image, which reference is actually pulled and
//! under which reference the image lands in the local registry.

use serde::Serialize;

use crate::reference::ImageReference;
use crate::registry_map::{RegistryMap, CATCH_ALL_REGISTRY};

/// Address of the local registry when none is configured.
pub const DEFAULT_LOCAL_REGISTRY: &str = "registry.local:9001";

/// The pull and push references computed for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    /// The reference the caller asked for.
    pub image: ImageReference,

    /// Reference to pull, possibly redirected to a private mirror.
    pub pull: String,

    /// Reference in the local registry namespace to tag and push.
    pub push: String,
}

impl ResolvedReference {
    /// Returns true if the pull reference differs from the requested image.
    #[must_use]
    pub fn is_redirected(&self) -> bool {
        self.pull != self.image.as_str()
    }
}

/// Rewrites image references for mirroring.
///
/// Built once per run from the configured [`RegistryMap`], the built-in
/// defaults it is compared against, and the local registry address.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    registries: RegistryMap,
    defaults: RegistryMap,
    local_registry: String,
}

impl ReferenceResolver {
    /// Creates a resolver comparing `registries` against the built-in defaults.
    #[must_use]
    pub fn new(registries: RegistryMap, local_registry: impl Into<String>) -> Self {
        Self {
            registries,
            defaults: RegistryMap::defaults(),
            local_registry: local_registry.into(),
        }
    }

    /// Overrides the default map used to detect "no redirection configured".
    #[must_use]
    pub fn with_defaults(mut self, defaults: RegistryMap) -> Self {
        self.defaults = defaults;
        self
    }

    /// Returns the configured registry map.
    #[must_use]
    pub const fn registries(&self) -> &RegistryMap {
        &self.registries
    }

    /// Returns the local registry address.
    #[must_use]
    pub fn local_registry(&self) -> &str {
        &self.local_registry
    }

    /// Returns true if the configured map redirects any pull.
    #[must_use]
    pub fn redirects(&self) -> bool {
        !(self.registries.same_entries(&self.defaults) || self.registries.is_passthrough())
    }

    /// Computes both references for an image.
    #[must_use]
    pub fn resolve(&self, image: &ImageReference) -> ResolvedReference {
        ResolvedReference {
            image: image.clone(),
            pull: self.pull_reference(image),
            push: self.push_reference(image),
        }
    }

    /// Computes the reference to pull.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmirror_core::{ImageReference, ReferenceResolver, RegistryMap};
    ///
    /// let map = RegistryMap::from_entries([("docker.io", "mirror.example")]).unwrap();
    /// let resolver = ReferenceResolver::new(map, "registry.local:9001");
    ///
    /// let image: ImageReference = "docker.io/foo:1".parse().unwrap();
    /// assert_eq!(resolver.pull_reference(&image), "mirror.example/foo:1");
    ///
    /// let already: ImageReference = "mirror.example/foo:1".parse().unwrap();
    /// assert_eq!(resolver.pull_reference(&already), "mirror.example/foo:1");
    /// ```
    #[must_use]
    pub fn pull_reference(&self, image: &ImageReference) -> String {
        if !self.redirects() {
            return image.to_string();
        }

        let reference = image.as_str();
        for (upstream, replacement) in self.registries.iter() {
            if let Some(rest) = strip_registry(reference, upstream) {
                return format!("{replacement}{rest}");
            }
            if strip_registry(reference, replacement).is_some() {
                return image.to_string();
            }
        }

        // Unknown registry, or no registry at all: fall back to the custom
        // catch-all registry when one is configured.
        let catch_all_default = self
            .defaults
            .get(CATCH_ALL_REGISTRY)
            .unwrap_or(CATCH_ALL_REGISTRY);
        match self.registries.get(CATCH_ALL_REGISTRY) {
            Some(custom) if custom != catch_all_default => format!("{custom}/{reference}"),
            _ => image.to_string(),
        }
    }

    /// Computes the local registry reference to tag and push.
    ///
    /// A port in the source registry is dropped, since the port would end up
    /// in the middle of the repository path where registries reject it.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmirror_core::{ImageReference, ReferenceResolver, RegistryMap};
    ///
    /// let resolver = ReferenceResolver::new(RegistryMap::defaults(), "registry.local:9001");
    /// let image: ImageReference = "myreg.io:5000/ns/app:v1".parse().unwrap();
    /// assert_eq!(resolver.push_reference(&image), "registry.local:9001/myreg.io/ns/app:v1");
    /// ```
    #[must_use]
    pub fn push_reference(&self, image: &ImageReference) -> String {
        format!("{}/{}", self.local_registry, sanitize_namespace(image))
    }
}

/// Strips `registry` from the front of `reference` when it is the whole
/// first path segment, returning the remainder starting at `/`.
fn strip_registry<'a>(reference: &'a str, registry: &str) -> Option<&'a str> {
    reference
        .strip_prefix(registry)
        .filter(|rest| rest.starts_with('/'))
}

fn sanitize_namespace(image: &ImageReference) -> String {
    let segment = image.registry_segment();
    match segment.split_once(':') {
        Some((host, _port)) => format!("{host}{}", image.remainder()),
        None => image.to_string(),
    }
}
