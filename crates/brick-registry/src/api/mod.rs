//! Registry API response types

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use brick_core::types::{BuildOptions, DependencyList, Manifest, ProjectType, Version};

use crate::RegistryResult;

/// Package metadata response: every published version of one package
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PackageData {
    /// Package name
    pub name: String,
    /// Package description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Named version pointers (`latest`)
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    /// All versions metadata, keyed by version string
    #[serde(default)]
    pub versions: IndexMap<String, VersionManifest>,
}

/// Manifest of a specific package version
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VersionManifest {
    /// Package name
    pub name: String,
    /// Version string
    pub version: String,
    /// Declared dependencies, same shorthand forms as brick.toml
    #[serde(default)]
    pub dependencies: DependencyList,
    /// Compile-option schema
    #[serde(default)]
    pub build: BuildOptions,
}

impl PackageData {
    /// Create metadata with no published versions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            dist_tags: BTreeMap::new(),
            versions: IndexMap::new(),
        }
    }

    /// Every published version that parses, ascending.
    ///
    /// Registry entries with malformed version keys are skipped.
    pub fn sorted_versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self
            .versions
            .keys()
            .filter_map(|key| match Version::parse(key) {
                Ok(version) => Some(version),
                Err(e) => {
                    warn!(package = %self.name, version = %key, error = %e, "skipping unparseable version");
                    None
                },
            })
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    /// Manifest published for exactly `version`
    pub fn version(&self, version: &Version) -> Option<&VersionManifest> {
        self.versions.get(&version.to_string()).or_else(|| {
            self.versions
                .iter()
                .find(|(key, _)| Version::parse(key).map_or(false, |parsed| &parsed == version))
                .map(|(_, manifest)| manifest)
        })
    }
}

impl VersionManifest {
    /// Build a registry entry from a canonical manifest
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            name: manifest.name.clone(),
            version: manifest.version.to_string(),
            dependencies: DependencyList::from_dependencies(manifest.dependencies.values()),
            build: manifest.build.clone(),
        }
    }

    /// Normalize into the canonical manifest; registry entries are always
    /// packages
    pub fn into_manifest(self) -> RegistryResult<Manifest> {
        Ok(Manifest {
            kind: ProjectType::Package,
            version: Version::parse(&self.version)?,
            dependencies: self.dependencies.normalize()?,
            name: self.name,
            build: self.build,
        })
    }
}
