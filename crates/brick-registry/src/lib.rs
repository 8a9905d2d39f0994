//! Package registry client for brick
//!
//! This crate provides the registry collaborator the resolver talks to: the
//! wire types of the registry API, an async HTTP client with retry logic, a
//! blocking adapter, and an in-memory registry for offline runs and tests.

pub mod api;
pub mod blocking;
pub mod client;
pub mod memory;

// Re-export main types
pub use api::{PackageData, VersionManifest};
pub use blocking::BlockingRegistry;
pub use client::{RegistryClient, RetryConfig};
pub use memory::MemoryRegistry;

use brick_core::error::BrickError;
use brick_core::types::Version;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, BrickError>;

/// Synchronous two-method registry contract consumed by the resolver
pub trait Registry {
    /// Metadata of every published version of `name`
    fn fetch_package_data(&self, name: &str) -> RegistryResult<PackageData>;

    /// Manifest of one exact published version
    fn fetch_version_manifest(&self, name: &str, version: &Version)
        -> RegistryResult<VersionManifest>;
}

impl<R: Registry + ?Sized> Registry for &R {
    fn fetch_package_data(&self, name: &str) -> RegistryResult<PackageData> {
        (**self).fetch_package_data(name)
    }

    fn fetch_version_manifest(
        &self,
        name: &str,
        version: &Version,
    ) -> RegistryResult<VersionManifest> {
        (**self).fetch_version_manifest(name, version)
    }
}
