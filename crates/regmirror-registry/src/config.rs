//! Configuration types for the engine client.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Engine endpoint used when none is configured.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:2375";

/// Registry implied by references without an explicit registry host.
const IMPLICIT_REGISTRY: &str = "docker.io";

/// Configuration for the container engine client.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine URL (e.g., "<http://localhost:2375>"; `tcp://` is accepted).
    pub url: String,

    /// Engine API version prefix (e.g., "1.41"). `None` lets the engine pick.
    pub api_version: Option<String>,

    /// Request timeout. Pulls of large images stream for a long time.
    pub timeout: Duration,

    /// Credentials sent in the `X-Registry-Auth` header, keyed by registry.
    pub credentials: CredentialStore,

    /// User agent string.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_URL)
    }
}

impl EngineConfig {
    /// Creates a new engine configuration with the given URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmirror_registry::EngineConfig;
    ///
    /// let config = EngineConfig::new("tcp://127.0.0.1:2375");
    /// assert_eq!(config.url, "tcp://127.0.0.1:2375");
    /// ```
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_version: None,
            timeout: Duration::from_secs(30 * 60),
            credentials: CredentialStore::default(),
            user_agent: format!("regmirror/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the API version prefix.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the registry credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = credentials;
        self
    }

    /// Returns the normalized base URL all API paths are appended to.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidUrl`] for unparseable URLs and for
    /// schemes other than `http`, `https` and `tcp`.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmirror_registry::EngineConfig;
    ///
    /// let config = EngineConfig::new("tcp://127.0.0.1:2375/").with_api_version("1.41");
    /// assert_eq!(config.base_url().unwrap(), "http://127.0.0.1:2375/v1.41");
    /// ```
    pub fn base_url(&self) -> Result<String, RegistryError> {
        let raw = self
            .url
            .strip_prefix("tcp://")
            .map_or_else(|| self.url.clone(), |rest| format!("http://{rest}"));

        let parsed = url::Url::parse(&raw).map_err(|e| RegistryError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let base = raw.trim_end_matches('/');
        Ok(match &self.api_version {
            Some(version) => format!("{base}/v{}", version.trim_start_matches('v')),
            None => base.to_string(),
        })
    }
}

/// Username and password for one registry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredentials {
    /// Username.
    pub username: String,
    /// Password or token.
    pub password: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RegistryCredentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Serialize)]
struct AuthConfig<'a> {
    username: &'a str,
    password: &'a str,
    serveraddress: &'a str,
}

/// Credentials keyed by registry host (including port when present).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CredentialStore {
    entries: HashMap<String, RegistryCredentials>,
}

impl CredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds credentials for a registry.
    #[must_use]
    pub fn with(mut self, registry: impl Into<String>, credentials: RegistryCredentials) -> Self {
        self.entries.insert(registry.into(), credentials);
        self
    }

    /// Parses a JSON object of `{"registry": {"username": .., "password": ..}}`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Json`] if the document is malformed.
    pub fn from_json(document: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(document).map_err(Into::into)
    }

    /// Reads and parses a credentials file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let document = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&document)
    }

    /// Returns the number of registries with credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no credentials are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the credentials for the registry a reference points at.
    #[must_use]
    pub fn for_reference(&self, reference: &str) -> Option<&RegistryCredentials> {
        self.entries.get(registry_host(reference))
    }

    /// Builds the `X-Registry-Auth` header value for a reference.
    ///
    /// Returns `None` when no credentials are configured for its registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Json`] if the auth document cannot be encoded.
    pub fn auth_header(&self, reference: &str) -> Result<Option<String>, RegistryError> {
        let Some(credentials) = self.for_reference(reference) else {
            return Ok(None);
        };
        let document = serde_json::to_vec(&AuthConfig {
            username: &credentials.username,
            password: &credentials.password,
            serveraddress: registry_host(reference),
        })?;
        Ok(Some(URL_SAFE.encode(document)))
    }
}

/// Returns the registry host a reference points at.
///
/// Follows the engine's convention: the first path segment is a registry
/// only if it contains a `.` or a `:`, or is `localhost`; otherwise the
/// reference lives on Docker Hub.
///
/// # Examples
///
/// ```
/// use regmirror_registry::registry_host;
///
/// assert_eq!(registry_host("registry.local:9001/docker.io/foo:1"), "registry.local:9001");
/// assert_eq!(registry_host("library/nginx:1.25"), "docker.io");
/// ```
#[must_use]
pub fn registry_host(reference: &str) -> &str {
    match reference.split_once('/') {
        Some((head, _)) if head.contains('.') || head.contains(':') || head == "localhost" => head,
        _ => IMPLICIT_REGISTRY,
    }
}
