//! Dependency resolution session
//!
//! A [`Session`] resolves exactly one root project. It owns every cache the
//! resolution needs, so two sessions never observe each other's choices and
//! resolving the same manifest twice in one session yields the same tree.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use camino::Utf8Path;
use tracing::{debug, info};

use brick_core::error::BrickError;
use brick_core::types::{parse_constraint, Dependency, Manifest, Version};
use brick_registry::{PackageData, Registry, VersionManifest};

use crate::locator::{Locator, Package, PackageId, PackageSource};
use crate::ResolverResult;

/// One vertex of the resolved dependency tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    /// Constraint exactly as written by the parent
    pub constraint: String,
    pub version: Version,
    /// Edge came from a vendor-only declaration
    pub vendor: bool,
    pub children: Vec<Arc<Node>>,
}

impl Node {
    pub fn id(&self) -> PackageId {
        PackageId::new(self.name.clone(), self.version.clone())
    }

    /// Number of nodes in this subtree, shared subtrees counted per edge
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|child| child.size()).sum::<usize>()
    }

    /// Indented text rendering, one `name@version` per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, "", true, true);
        out
    }

    fn render_into(&self, out: &mut String, prefix: &str, last: bool, root: bool) {
        let (branch, indent) = match (root, last) {
            (true, _) => ("", ""),
            (false, true) => ("`-- ", "    "),
            (false, false) => ("|-- ", "|   "),
        };
        let vendor = if self.vendor { " (vendor)" } else { "" };
        let _ = writeln!(out, "{}{}{}@{}{}", prefix, branch, self.name, self.version, vendor);

        let child_prefix = format!("{}{}", prefix, indent);
        for (index, child) in self.children.iter().enumerate() {
            child.render_into(out, &child_prefix, index + 1 == self.children.len(), false);
        }
    }
}

/// Output of one session: the tree and every package it reached
#[derive(Debug, Clone)]
pub struct Resolution {
    pub root: Arc<Node>,
    pub root_package: Arc<Package>,
    pub packages: HashMap<PackageId, Arc<Package>>,
}

impl Resolution {
    /// Located package for a resolved (name, version)
    pub fn package(&self, name: &str, version: &Version) -> Option<&Arc<Package>> {
        self.packages.get(&PackageId::new(name, version.clone()))
    }
}

/// Cache key of an already expanded edge
type EdgeKey = (String, String, bool);

/// Resolution session: caches scoped to one root project
pub struct Session<'r> {
    registry: &'r dyn Registry,
    locator: Locator,
    /// Registry metadata per name; `None` when the registry does not know it
    metadata: HashMap<String, Option<PackageData>>,
    /// Located packages per (name, version)
    packages: HashMap<PackageId, Arc<Package>>,
    /// Chosen version per (name, constraint)
    queries: HashMap<(String, String), Version>,
    /// Every version chosen so far per name
    chosen: HashMap<String, BTreeSet<Version>>,
    /// Sorted candidate list per (name, vendor-only)
    versions: HashMap<(String, bool), Vec<Version>>,
    /// Expanded subtrees per edge
    nodes: HashMap<EdgeKey, Arc<Node>>,
    /// (name, constraint) pairs on the current path
    in_progress: Vec<(String, String)>,
}

impl<'r> Session<'r> {
    pub fn new(registry: &'r dyn Registry, locator: Locator) -> Self {
        Self {
            registry,
            locator,
            metadata: HashMap::new(),
            packages: HashMap::new(),
            queries: HashMap::new(),
            chosen: HashMap::new(),
            versions: HashMap::new(),
            nodes: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Resolve the project at `dir` into a full dependency tree
    pub fn resolve_project(
        mut self,
        dir: &Utf8Path,
        manifest: Manifest,
    ) -> ResolverResult<Resolution> {
        let root_package = Arc::new(Package::new(
            manifest,
            dir.to_path_buf(),
            PackageSource::Root,
        ));
        let manifest = &root_package.manifest;
        let constraint = manifest.version.to_string();

        // A publishable root resolves to itself without a registry round trip
        if manifest.is_package() {
            self.packages.insert(root_package.id(), root_package.clone());
            self.choose(&manifest.name, &manifest.version);
        }

        info!(project = %manifest.name, "resolving dependencies");
        self.in_progress.push((manifest.name.clone(), constraint.clone()));
        let children = manifest
            .dependencies
            .values()
            .map(|dependency| self.resolve_tree(dependency))
            .collect::<ResolverResult<Vec<_>>>();
        self.in_progress.pop();

        let root = Arc::new(Node {
            name: manifest.name.clone(),
            constraint,
            version: manifest.version.clone(),
            vendor: false,
            children: children?,
        });

        info!(
            project = %manifest.name,
            packages = self.packages.len(),
            "resolution complete"
        );

        Ok(Resolution {
            root,
            root_package,
            packages: self.packages,
        })
    }

    /// Resolve one declared edge and everything below it, depth-first
    pub fn resolve_tree(&mut self, dependency: &Dependency) -> ResolverResult<Arc<Node>> {
        let edge: EdgeKey = (
            dependency.name.clone(),
            dependency.constraint.clone(),
            dependency.vendor,
        );
        if let Some(node) = self.nodes.get(&edge) {
            debug!(package = %dependency.name, constraint = %dependency.constraint, "reusing resolved subtree");
            return Ok(node.clone());
        }

        let frame = (dependency.name.clone(), dependency.constraint.clone());
        if let Some(start) = self.in_progress.iter().position(|entry| *entry == frame) {
            let mut cycle: Vec<&str> = self.in_progress[start..]
                .iter()
                .map(|(name, _)| name.as_str())
                .collect();
            cycle.push(&dependency.name);
            return Err(BrickError::DependencyCycle {
                cycle: cycle.join(" -> "),
            });
        }

        self.in_progress.push(frame);
        let node = self.expand(dependency);
        self.in_progress.pop();

        let node = Arc::new(node?);
        self.nodes.insert(edge, node.clone());
        Ok(node)
    }

    fn expand(&mut self, dependency: &Dependency) -> ResolverResult<Node> {
        let version =
            self.resolve_version_for(&dependency.name, &dependency.constraint, dependency.vendor)?;
        let package = self.package(&dependency.name, &version, dependency.vendor)?;

        let children = package
            .manifest
            .dependencies
            .values()
            .map(|child| self.resolve_tree(child))
            .collect::<ResolverResult<Vec<_>>>()?;

        Ok(Node {
            name: dependency.name.clone(),
            constraint: dependency.constraint.clone(),
            version,
            vendor: dependency.vendor,
            children,
        })
    }

    /// Choose a concrete version of `name` for `constraint`
    pub fn resolve_version(&mut self, name: &str, constraint: &str) -> ResolverResult<Version> {
        self.resolve_version_for(name, constraint, false)
    }

    fn resolve_version_for(
        &mut self,
        name: &str,
        constraint: &str,
        vendor: bool,
    ) -> ResolverResult<Version> {
        // Exact pins are authoritative
        if let Ok(version) = Version::parse(constraint.trim()) {
            debug!(package = %name, version = %version, "exact pin");
            self.choose(name, &version);
            return Ok(version);
        }

        let key = (name.to_string(), constraint.to_string());
        if let Some(version) = self.queries.get(&key) {
            return Ok(version.clone());
        }

        let query = parse_constraint(constraint)?;

        // Converge on a version already chosen elsewhere in the tree
        let reused = self
            .chosen
            .get(name)
            .and_then(|chosen| chosen.iter().rev().find(|version| query.matches(version)))
            .cloned();
        if let Some(version) = reused {
            debug!(package = %name, constraint = %constraint, version = %version, "reusing chosen version");
            self.queries.insert(key, version.clone());
            return Ok(version);
        }

        let versions = self.candidate_versions(name, constraint, vendor)?;
        let version = query
            .find_best(versions)
            .cloned()
            .ok_or_else(|| BrickError::NoSatisfyingVersion {
                package: name.to_string(),
                constraint: constraint.to_string(),
            })?;

        debug!(package = %name, constraint = %constraint, version = %version, "selected version");
        self.choose(name, &version);
        self.queries.insert(key, version.clone());
        Ok(version)
    }

    fn choose(&mut self, name: &str, version: &Version) {
        self.chosen
            .entry(name.to_string())
            .or_default()
            .insert(version.clone());
    }

    /// Sorted candidate list: the vendor directory for vendor-only edges,
    /// the registry otherwise, falling back to local copies for packages the
    /// registry does not know
    fn candidate_versions(
        &mut self,
        name: &str,
        constraint: &str,
        vendor: bool,
    ) -> ResolverResult<&[Version]> {
        let key = (name.to_string(), vendor);
        if !self.versions.contains_key(&key) {
            let versions = if vendor {
                let versions = self.locator.local_versions(name, false)?;
                if versions.is_empty() {
                    return Err(BrickError::VendorPackageNotFound {
                        package: name.to_string(),
                        version: constraint.to_string(),
                    });
                }
                versions
            } else {
                match self.metadata(name)?.map(PackageData::sorted_versions) {
                    Some(versions) => versions,
                    None => {
                        let versions = self.locator.local_versions(name, true)?;
                        if versions.is_empty() {
                            return Err(BrickError::PackageNotFound {
                                name: name.to_string(),
                                version: None,
                            });
                        }
                        versions
                    },
                }
            };
            self.versions.insert(key.clone(), versions);
        }
        Ok(self.versions.get(&key).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Registry metadata for `name`, fetched at most once per session
    fn metadata(&mut self, name: &str) -> ResolverResult<Option<&PackageData>> {
        if !self.metadata.contains_key(name) {
            let data = match self.registry.fetch_package_data(name) {
                Ok(data) => Some(data),
                Err(BrickError::PackageNotFound { .. }) => None,
                Err(e) => return Err(e),
            };
            self.metadata.insert(name.to_string(), data);
        }
        Ok(self.metadata.get(name).and_then(Option::as_ref))
    }

    /// Package for a resolved (name, version): local copies first, then the
    /// registry
    fn package(&mut self, name: &str, version: &Version, vendor: bool) -> ResolverResult<Arc<Package>> {
        let id = PackageId::new(name, version.clone());
        if let Some(package) = self.packages.get(&id) {
            return Ok(package.clone());
        }

        // Vendor edges only differ in having no registry fallback
        let package = match self.locator.find(name, version, false)? {
            Some(package) => package,
            None if vendor => {
                return Err(BrickError::VendorPackageNotFound {
                    package: name.to_string(),
                    version: version.to_string(),
                })
            },
            None => {
                let entry = self.version_manifest(name, version)?;
                let path = self.locator.module_cache_path(name, version)?;
                Package::new(entry.into_manifest()?, path, PackageSource::Registry)
            },
        };

        let package = Arc::new(package);
        self.packages.insert(id, package.clone());
        Ok(package)
    }

    fn version_manifest(&mut self, name: &str, version: &Version) -> ResolverResult<VersionManifest> {
        let cached = self
            .metadata
            .get(name)
            .and_then(Option::as_ref)
            .and_then(|data| data.version(version))
            .cloned();
        if let Some(entry) = cached {
            return Ok(entry);
        }

        self.registry
            .fetch_version_manifest(name, version)
            .map_err(|e| match e {
                BrickError::PackageNotFound { .. } => BrickError::PackageNotFound {
                    name: name.to_string(),
                    version: Some(version.to_string()),
                },
                other => other,
            })
    }
}
