//! HTTP client implementation with connection pooling and retry logic

use std::time::Duration;

use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use brick_core::error::BrickError;
use brick_core::types::Version;

use crate::api::{PackageData, VersionManifest};
use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Async HTTP client for the package registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Base registry URL
    base_url: Url,
}

impl RegistryClient {
    /// Create new registry client with connection pooling
    pub fn new(base_url: Url) -> RegistryResult<Self> {
        Self::with_config(base_url, RetryConfig::default())
    }

    /// Create registry client with custom retry configuration
    pub fn with_config(base_url: Url, retry_config: RetryConfig) -> RegistryResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(BrickError::ConfigValidation {
                field: "registry".to_string(),
                reason: format!("'{}' cannot be used as a base URL", base_url),
            });
        }

        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            // Request timeout
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .user_agent(concat!("brick/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BrickError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute HTTP request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if attempt == self.retry_config.max_retries || !Self::is_retryable(&error) {
                return Err(error);
            }
            attempt += 1;
            warn!(attempt, error = %error, "registry request failed, retrying");

            // Wait before retry
            tokio::time::sleep(delay).await;

            delay = std::cmp::min(
                Duration::from_millis((delay.as_millis() as f64 * self.retry_config.multiplier) as u64),
                self.retry_config.max_delay,
            );
        }
    }

    /// Transport failures and server errors are worth another attempt
    fn is_retryable(error: &BrickError) -> bool {
        match error {
            BrickError::Network { .. } => true,
            BrickError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Registry URL for the given path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in with_config
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET `url` and decode its JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        name: &str,
        version: Option<&Version>,
    ) -> RegistryResult<T> {
        self.with_retry(|| async {
            debug!(url = %url, "registry request");
            let response = self
                .client
                .get(url.clone())
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| BrickError::network(format!("Failed to reach {}: {}", url, e), e))?;

            match response.status() {
                status if status.is_success() => {
                    let body = response.bytes().await.map_err(|e| {
                        BrickError::network(format!("Failed to read response from {}: {}", url, e), e)
                    })?;
                    serde_json::from_slice(&body).map_err(|e| BrickError::JsonParse {
                        message: format!("{}: {}", url, e),
                    })
                },
                StatusCode::NOT_FOUND => Err(BrickError::PackageNotFound {
                    name: name.to_string(),
                    version: version.map(Version::to_string),
                }),
                status => Err(BrickError::Http {
                    status: status.as_u16(),
                    url: url.to_string(),
                }),
            }
        })
        .await
    }

    /// Fetch package metadata with retry logic
    pub async fn fetch_package_data(&self, name: &str) -> RegistryResult<PackageData> {
        let url = self.endpoint(&[name]);
        self.get_json(&url, name, None).await
    }

    /// Fetch the manifest of one exact version with retry logic
    pub async fn fetch_version_manifest(
        &self,
        name: &str,
        version: &Version,
    ) -> RegistryResult<VersionManifest> {
        let version_text = version.to_string();
        let url = self.endpoint(&[name, &version_text]);
        self.get_json(&url, name, Some(version)).await
    }
}
