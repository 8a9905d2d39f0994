//! Package manifest types.
//!
//! `Manifest` is the canonical, already-normalized view of a project or
//! package, whether it was read from a local `brick.toml` or from a registry
//! version entry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Definitions, Dependency, Version, Visibility};

/// Declared project type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Top-level program; never valid inside a dependency tree
    #[default]
    Application,
    /// Publishable, consumable package
    Package,
}

/// Compile-option schema of a project or package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// No translation units; consumers only see headers
    pub header_only: bool,
    /// Compiled once and shared identically by every consumer
    pub singleton: bool,
    /// Requested language standard token (`c11`, `c++17`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    /// Default compile flags
    pub flags: Vec<String>,
    /// The project's own definitions
    pub definitions: Definitions,
    /// Definitions pushed onto every dependency (root project only)
    pub global_definitions: Vec<String>,
    /// Accepted global keys, `KEY=value` entries give defaults
    pub global: Definitions,
    /// Keys every direct consumer must supply
    pub required: Definitions,
    /// Keys a direct consumer may supply
    pub optional: Definitions,
    /// Definitions always applied to this package
    pub ingest: Definitions,
    /// Prebuilt libraries linked directly by this target
    pub shared_libraries: Vec<SharedLibrary>,
}

/// Prebuilt or system library declared on a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLibrary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub header_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Visibility>,
    #[serde(default)]
    pub link_flags: Vec<String>,
}

/// Canonical manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub kind: ProjectType,
    pub name: String,
    pub version: Version,
    pub dependencies: IndexMap<String, Dependency>,
    pub build: BuildOptions,
}

impl Manifest {
    /// Create a manifest with no dependencies and default build options
    pub fn new(kind: ProjectType, name: impl Into<String>, version: Version) -> Self {
        Self {
            kind,
            name: name.into(),
            version,
            dependencies: IndexMap::new(),
            build: BuildOptions::default(),
        }
    }

    /// Add a dependency, replacing any earlier one with the same name
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.insert(dependency.name.clone(), dependency);
        self
    }

    pub fn with_build(mut self, build: BuildOptions) -> Self {
        self.build = build;
        self
    }

    pub fn is_package(&self) -> bool {
        self.kind == ProjectType::Package
    }

    /// Declared dependency entry for `name`
    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.get(name)
    }

    /// Check if this is a valid package name
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !name.starts_with(['-', '.'])
            && !name.ends_with('-')
            && !name.contains("__")
    }
}
