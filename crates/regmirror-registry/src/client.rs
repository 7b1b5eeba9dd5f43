//! Image client capability and the container engine implementation.
//!
//! The mirror only needs three operations from whatever moves image bytes:
//! pull, tag and push. [`ImageClient`] is that seam; [`EngineClient`] drives a
//! container engine over its HTTP API.

use async_trait::async_trait;
use regmirror_core::split_tag;
use reqwest::Response;

use crate::config::EngineConfig;
use crate::error::RegistryError;
use crate::progress::{check_stream, engine_message};

/// Header carrying base64url-encoded registry credentials.
const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

/// Encoded empty auth document (`{}`), sent on push when no credentials apply.
const EMPTY_REGISTRY_AUTH: &str = "e30=";

/// Pull, tag and push operations against some image store.
///
/// Implementations report a missing image as [`RegistryError::NotFound`] and
/// missing or rejected credentials as [`RegistryError::AuthenticationFailed`];
/// every other error is treated as transient by callers.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Fetches `reference` from its source registry.
    async fn pull(&self, reference: &str) -> Result<(), RegistryError>;

    /// Associates the already pulled `source` image with `target`.
    async fn tag(&self, source: &str, target: &str) -> Result<(), RegistryError>;

    /// Uploads `reference` to the registry named in it.
    async fn push(&self, reference: &str) -> Result<(), RegistryError>;
}

/// Client for a container engine's HTTP API.
#[derive(Debug)]
pub struct EngineClient {
    config: EngineConfig,
    base_url: String,
    http: reqwest::Client,
}

impl EngineClient {
    /// Creates a new engine client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine URL is invalid or the HTTP client
    /// cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use regmirror_registry::{EngineClient, EngineConfig};
    ///
    /// let config = EngineConfig::new("http://localhost:2375");
    /// let client = EngineClient::new(config)?;
    /// # Ok::<(), regmirror_registry::RegistryError>(())
    /// ```
    pub fn new(config: EngineConfig) -> Result<Self, RegistryError> {
        let base_url = config.base_url()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|source| RegistryError::ConnectionFailed {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            config,
            base_url,
            http,
        })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the normalized base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that the engine answers its ping endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), RegistryError> {
        let url = format!("{}/_ping", self.base_url);
        let response = self.http.get(&url).send().await?;
        Self::check_status(response, &url).await.map(|_| ())
    }

    async fn check_status(response: Response, reference: &str) -> Result<Response, RegistryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::from_status(
            status.as_u16(),
            reference,
            engine_message(&body),
        ))
    }
}

#[async_trait]
impl ImageClient for EngineClient {
    async fn pull(&self, reference: &str) -> Result<(), RegistryError> {
        let (name, tag) = pull_parameters(reference);
        let url = format!("{}/images/create", self.base_url);

        let mut request = self
            .http
            .post(&url)
            .query(&[("fromImage", name), ("tag", tag)]);
        if let Some(auth) = self.config.credentials.auth_header(reference)? {
            request = request.header(REGISTRY_AUTH_HEADER, auth);
        }

        tracing::debug!(reference, "pulling image");
        let response = Self::check_status(request.send().await?, reference).await?;
        let body = response.text().await?;
        check_stream(reference, &body)
    }

    async fn tag(&self, source: &str, target: &str) -> Result<(), RegistryError> {
        let (repo, tag) = split_tag(target);
        let url = format!("{}/images/{source}/tag", self.base_url);

        tracing::debug!(source, target, "tagging image");
        let response = self
            .http
            .post(&url)
            .query(&[("repo", repo), ("tag", tag.unwrap_or("latest"))])
            .send()
            .await?;
        Self::check_status(response, source).await.map(|_| ())
    }

    async fn push(&self, reference: &str) -> Result<(), RegistryError> {
        let (name, tag) = split_tag(reference);
        let url = format!("{}/images/{name}/push", self.base_url);
        let auth = self
            .config
            .credentials
            .auth_header(reference)?
            .unwrap_or_else(|| EMPTY_REGISTRY_AUTH.to_string());

        tracing::debug!(reference, "pushing image");
        let response = self
            .http
            .post(&url)
            .query(&[("tag", tag.unwrap_or("latest"))])
            .header(REGISTRY_AUTH_HEADER, auth)
            .send()
            .await?;
        let response = Self::check_status(response, reference).await?;
        let body = response.text().await?;
        check_stream(reference, &body)
    }
}

/// Splits a reference into the `fromImage` and `tag` pull parameters.
///
/// A digest travels in the `tag` parameter; an untagged reference pulls
/// `latest` rather than every tag of the repository.
fn pull_parameters(reference: &str) -> (&str, &str) {
    if let Some((name, digest)) = reference.split_once('@') {
        return (name, digest);
    }
    let (name, tag) = split_tag(reference);
    (name, tag.unwrap_or("latest"))
}
