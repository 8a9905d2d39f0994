//! Blocking adapter over the async registry client
//!
//! Resolution is single-threaded and synchronous, so the resolver talks to
//! the network through this adapter. It owns a current-thread runtime and
//! must not be used from inside another async runtime.

use tokio::runtime::{Builder, Runtime};
use url::Url;

use brick_core::error::BrickError;
use brick_core::types::Version;

use crate::api::{PackageData, VersionManifest};
use crate::client::{RegistryClient, RetryConfig};
use crate::{Registry, RegistryResult};

/// Synchronous registry backed by [`RegistryClient`]
pub struct BlockingRegistry {
    client: RegistryClient,
    runtime: Runtime,
}

impl BlockingRegistry {
    /// Create a blocking registry for `base_url` with default retry policy
    pub fn new(base_url: Url) -> RegistryResult<Self> {
        Self::with_client(RegistryClient::new(base_url)?)
    }

    pub fn with_retry(base_url: Url, retry_config: RetryConfig) -> RegistryResult<Self> {
        Self::with_client(RegistryClient::with_config(base_url, retry_config)?)
    }

    /// Wrap an existing client
    pub fn with_client(client: RegistryClient) -> RegistryResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BrickError::io("Failed to start registry runtime".to_string(), e))?;
        Ok(Self { client, runtime })
    }

    pub fn client(&self) -> &RegistryClient {
        &self.client
    }
}

impl Registry for BlockingRegistry {
    fn fetch_package_data(&self, name: &str) -> RegistryResult<PackageData> {
        self.runtime.block_on(self.client.fetch_package_data(name))
    }

    fn fetch_version_manifest(
        &self,
        name: &str,
        version: &Version,
    ) -> RegistryResult<VersionManifest> {
        self.runtime
            .block_on(self.client.fetch_version_manifest(name, version))
    }
}
