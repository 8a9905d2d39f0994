//! In-process registry
//!
//! Serves published manifests from memory. An empty `MemoryRegistry` is the
//! offline registry: every lookup reports `PackageNotFound`, so only local
//! packages resolve.

use std::cell::Cell;
use std::collections::BTreeMap;

use brick_core::error::BrickError;
use brick_core::types::{Manifest, Version};

use crate::api::{PackageData, VersionManifest};
use crate::{Registry, RegistryResult};

/// Registry held entirely in memory, with per-method fetch counters
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    packages: BTreeMap<String, PackageData>,
    package_data_fetches: Cell<usize>,
    version_manifest_fetches: Cell<usize>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a package version, replacing any earlier entry for it
    pub fn publish(&mut self, manifest: &Manifest) {
        let entry = VersionManifest::from_manifest(manifest);
        let data = self
            .packages
            .entry(manifest.name.clone())
            .or_insert_with(|| PackageData::new(manifest.name.clone()));

        data.versions.insert(entry.version.clone(), entry);
        data.versions
            .sort_by(|a, _, b, _| match (Version::parse(a), Version::parse(b)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            });

        let latest = data.sorted_versions().into_iter().rev().find(|v| !v.is_prerelease());
        if let Some(latest) = latest {
            data.dist_tags.insert("latest".to_string(), latest.to_string());
        }
    }

    /// Builder-style [`publish`](Self::publish)
    pub fn with(mut self, manifest: &Manifest) -> Self {
        self.publish(manifest);
        self
    }

    /// Remove one published version; returns whether it existed
    pub fn unpublish(&mut self, name: &str, version: &Version) -> bool {
        let Some(data) = self.packages.get_mut(name) else {
            return false;
        };
        let removed = data.versions.shift_remove(&version.to_string()).is_some();
        if data.versions.is_empty() {
            self.packages.remove(name);
        }
        removed
    }

    /// Number of `fetch_package_data` calls served so far
    pub fn package_data_fetches(&self) -> usize {
        self.package_data_fetches.get()
    }

    /// Number of `fetch_version_manifest` calls served so far
    pub fn version_manifest_fetches(&self) -> usize {
        self.version_manifest_fetches.get()
    }

    fn not_found(name: &str, version: Option<&Version>) -> BrickError {
        BrickError::PackageNotFound {
            name: name.to_string(),
            version: version.map(Version::to_string),
        }
    }
}

impl Registry for MemoryRegistry {
    fn fetch_package_data(&self, name: &str) -> RegistryResult<PackageData> {
        self.package_data_fetches.set(self.package_data_fetches.get() + 1);
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| Self::not_found(name, None))
    }

    fn fetch_version_manifest(
        &self,
        name: &str,
        version: &Version,
    ) -> RegistryResult<VersionManifest> {
        self.version_manifest_fetches
            .set(self.version_manifest_fetches.get() + 1);
        self.packages
            .get(name)
            .and_then(|data| data.version(version))
            .cloned()
            .ok_or_else(|| Self::not_found(name, Some(version)))
    }
}
