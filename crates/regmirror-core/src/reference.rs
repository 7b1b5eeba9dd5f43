//! Container image references.
//!
//! An [`ImageReference`] is the string form a user hands to the mirror,
//! structurally `[registry[:port]/]repository/name[:tag]`. Only the pieces
//! the resolver needs are exposed; no full grammar parse is performed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A validated container image reference.
///
/// Invariants: non-empty, free of whitespace, and containing at least one
/// `/` that separates a leading registry or namespace segment from the rest
/// of the repository path.
///
/// # Examples
///
/// ```
/// use regmirror_core::ImageReference;
///
/// let image: ImageReference = "privateregistry.io:5000/kube-proxy:v1.16.0".parse().unwrap();
/// assert_eq!(image.registry_segment(), "privateregistry.io:5000");
/// assert_eq!(image.remainder(), "/kube-proxy:v1.16.0");
///
/// assert!("kube-proxy:v1.16.0".parse::<ImageReference>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageReference(String);

impl ImageReference {
    /// Parses and validates an image reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReference`] if the reference is empty, contains
    /// whitespace, has no `/` separator, or starts or ends with `/`.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        if reference.is_empty() {
            return Err(invalid("reference cannot be empty"));
        }
        if reference.chars().any(char::is_whitespace) {
            return Err(invalid("reference cannot contain whitespace"));
        }
        if !reference.contains('/') {
            return Err(invalid(
                "missing repository separator '/'; references must be fully qualified",
            ));
        }
        if reference.starts_with('/') || reference.ends_with('/') {
            return Err(invalid("reference cannot start or end with '/'"));
        }

        Ok(Self(reference.to_string()))
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the text before the first `/`.
    ///
    /// For fully qualified references this is the registry host, possibly
    /// with a port. For Docker Hub shorthand (`library/nginx`) it is the
    /// first namespace component.
    #[must_use]
    pub fn registry_segment(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(head, _)| head)
    }

    /// Returns everything from the first `/` onward, separator included.
    #[must_use]
    pub fn remainder(&self) -> &str {
        self.0.find('/').map_or("", |idx| &self.0[idx..])
    }

    /// Returns true if the registry segment carries an explicit port.
    #[must_use]
    pub fn has_registry_port(&self) -> bool {
        self.registry_segment().contains(':')
    }

    /// Splits the reference into its name and optional tag.
    ///
    /// See [`split_tag`].
    #[must_use]
    pub fn split_tag(&self) -> (&str, Option<&str>) {
        split_tag(&self.0)
    }

    /// Consumes the reference and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Splits a reference string into its name and optional tag.
///
/// The tag is the text after the last `:` that follows the last `/`, so a
/// registry port is never mistaken for a tag. Digest references
/// (`name@sha256:...`) are returned whole with no tag.
///
/// # Examples
///
/// ```
/// use regmirror_core::split_tag;
///
/// assert_eq!(split_tag("quay.io/calico/node:v3.6"), ("quay.io/calico/node", Some("v3.6")));
/// assert_eq!(split_tag("myreg.io:5000/app"), ("myreg.io:5000/app", None));
/// ```
#[must_use]
pub fn split_tag(reference: &str) -> (&str, Option<&str>) {
    if reference.contains('@') {
        return (reference, None);
    }

    let name_start = reference.rfind('/').map_or(0, |idx| idx + 1);
    match reference[name_start..].rfind(':') {
        Some(offset) => {
            let colon = name_start + offset;
            (&reference[..colon], Some(&reference[colon + 1..]))
        }
        None => (reference, None),
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImageReference {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImageReference> for String {
    fn from(reference: ImageReference) -> Self {
        reference.0
    }
}

impl AsRef<str> for ImageReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
