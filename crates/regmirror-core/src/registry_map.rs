//! Registry redirection maps.
//!
//! A [`RegistryMap`] maps well-known upstream registries to the registry that
//! should actually be pulled from. An entry that maps a registry to itself
//! means no private mirror is configured for it.

use serde_json::Value;

use crate::error::{Error, Result};

/// Registries recognised out of the box, in scan order.
pub const DEFAULT_REGISTRIES: [&str; 5] = [
    "docker.io",
    "gcr.io",
    "k8s.gcr.io",
    "quay.io",
    "docker.elastic.co",
];

/// Registry whose replacement is prepended to references that match no entry.
pub const CATCH_ALL_REGISTRY: &str = "docker.io";

/// Ordered mapping from upstream registry hostname to replacement registry.
///
/// A replacement may carry a namespace path, such as `my.registry.io/k8s`,
/// for mirrors that keep each upstream under its own prefix.
///
/// Order matters: the resolver scans entries front to back and the first
/// matching entry wins. The map is built once before a batch starts and is
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryMap {
    entries: Vec<(String, String)>,
}

impl Default for RegistryMap {
    fn default() -> Self {
        Self::defaults()
    }
}

impl RegistryMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the built-in map where every known registry maps to itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmirror_core::RegistryMap;
    ///
    /// let defaults = RegistryMap::defaults();
    /// assert_eq!(defaults.len(), 5);
    /// assert!(defaults.is_passthrough());
    /// assert_eq!(defaults.get("quay.io"), Some("quay.io"));
    /// ```
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            entries: DEFAULT_REGISTRIES
                .iter()
                .map(|r| ((*r).to_string(), (*r).to_string()))
                .collect(),
        }
    }

    /// Builds a map from `(upstream, replacement)` pairs, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegistryMap`] if an upstream hostname is empty
    /// or contains `/` or whitespace, if a replacement is empty, contains
    /// whitespace or starts or ends with `/`, or if an upstream registry
    /// appears twice.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (upstream, replacement) in entries {
            let upstream = upstream.into();
            let replacement = replacement.into();
            validate_hostname(&upstream)?;
            validate_replacement(&replacement)?;

            if map.get(&upstream).is_some() {
                return Err(Error::InvalidRegistryMap {
                    reason: format!("registry '{upstream}' is mapped more than once"),
                });
            }
            map.entries.push((upstream, replacement));
        }
        Ok(map)
    }

    /// Parses a map from a JSON object such as `{"docker.io": "mirror:5000"}`.
    ///
    /// Key order in the document is preserved. A blank document yields the
    /// built-in defaults, which is the same as configuring no redirection.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object of strings or if
    /// any entry is rejected by [`RegistryMap::from_entries`].
    ///
    /// # Examples
    ///
    /// ```
    /// use regmirror_core::RegistryMap;
    ///
    /// let map = RegistryMap::from_json(r#"{"docker.io": "mirror.example", "quay.io": "quay.io"}"#).unwrap();
    /// assert_eq!(map.get("docker.io"), Some("mirror.example"));
    /// assert!(!map.is_passthrough());
    /// ```
    pub fn from_json(document: &str) -> Result<Self> {
        if document.trim().is_empty() {
            return Ok(Self::defaults());
        }

        let value: Value = serde_json::from_str(document)?;
        let Value::Object(object) = value else {
            return Err(Error::InvalidRegistryMap {
                reason: "expected a JSON object of registry to registry".to_string(),
            });
        };

        let mut entries = Vec::with_capacity(object.len());
        for (upstream, replacement) in object {
            let Value::String(replacement) = replacement else {
                return Err(Error::InvalidRegistryMap {
                    reason: format!("replacement for '{upstream}' must be a string"),
                });
            };
            entries.push((upstream, replacement));
        }

        Self::from_entries(entries)
    }

    /// Adds or replaces an entry, keeping the position of a replaced entry.
    #[must_use]
    pub fn with_entry(mut self, upstream: impl Into<String>, replacement: impl Into<String>) -> Self {
        let upstream = upstream.into();
        let replacement = replacement.into();
        match self.entries.iter_mut().find(|(u, _)| *u == upstream) {
            Some(entry) => entry.1 = replacement,
            None => self.entries.push((upstream, replacement)),
        }
        self
    }

    /// Returns the replacement configured for an upstream registry.
    #[must_use]
    pub fn get(&self, upstream: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(u, _)| u == upstream)
            .map(|(_, r)| r.as_str())
    }

    /// Iterates over `(upstream, replacement)` pairs in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(u, r)| (u.as_str(), r.as_str()))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if every entry maps a registry to itself.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.entries.iter().all(|(u, r)| u == r)
    }

    /// Compares two maps by content, ignoring entry order.
    #[must_use]
    pub fn same_entries(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(u, r)| other.get(u) == Some(r))
    }
}

fn validate_hostname(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::InvalidRegistryMap {
            reason: "registry hostname cannot be empty".to_string(),
        });
    }
    if host.contains('/') || host.chars().any(char::is_whitespace) {
        return Err(Error::InvalidRegistryMap {
            reason: format!("'{host}' is not a registry hostname"),
        });
    }
    Ok(())
}

fn validate_replacement(replacement: &str) -> Result<()> {
    if replacement.is_empty() {
        return Err(Error::InvalidRegistryMap {
            reason: "replacement registry cannot be empty".to_string(),
        });
    }
    if replacement.starts_with('/')
        || replacement.ends_with('/')
        || replacement.chars().any(char::is_whitespace)
    {
        return Err(Error::InvalidRegistryMap {
            reason: format!("'{replacement}' is not a registry or registry path"),
        });
    }
    Ok(())
}
