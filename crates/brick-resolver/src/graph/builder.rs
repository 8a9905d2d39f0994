//! Build plan construction from a resolved dependency tree

use std::collections::HashMap;

use tracing::{debug, info};

use brick_core::error::BrickError;
use brick_core::types::{Definitions, Dependency, Manifest, SharedLibrary, Standard, Visibility};
use brick_core::utils::ContentHasher;

use super::definitions::{fill_definitions, Consumer, Globals};
use super::{BuildPlan, LinkEdge, Target, TargetId, TargetSet};
use crate::locator::Package;
use crate::session::{Node, Resolution};
use crate::ResolverResult;

/// Prefix marking a linker-only token in a mixed flag list
const LINK_FLAG_PREFIX: &str = "-l";

/// Turn a resolution into the project's build plan
pub fn build_plan(resolution: &Resolution) -> ResolverResult<BuildPlan> {
    let root_package = &resolution.root_package;
    let root_manifest = &root_package.manifest;

    let mut builder = PlanBuilder {
        resolution,
        globals: Globals::new(root_manifest),
        names: HashMap::new(),
        targets: TargetSet::new(),
        shared: TargetSet::new(),
    };

    let root = builder.root_target(root_package)?;
    let root_id = root.id.clone();
    builder.targets.insert(root.clone());
    builder.attach_shared_libraries(&root, root_manifest);
    builder.visit(&resolution.root, root_package, &root)?;

    if let Some(key) = builder.globals.unrecognized() {
        return Err(BrickError::UnrecognizedGlobalDefinition {
            key: key.to_string(),
        });
    }

    info!(
        project = %root_manifest.name,
        targets = builder.targets.len(),
        shared_libraries = builder.shared.len(),
        "build plan ready"
    );

    Ok(BuildPlan {
        root: root_id,
        targets: builder.targets,
        shared_libraries: builder.shared,
    })
}

struct PlanBuilder<'a> {
    resolution: &'a Resolution,
    globals: Globals,
    /// Occurrences of each display name so far, across both sets
    names: HashMap<String, usize>,
    targets: TargetSet,
    shared: TargetSet,
}

impl<'a> PlanBuilder<'a> {
    fn root_target(&mut self, package: &Package) -> ResolverResult<Target> {
        let manifest = &package.manifest;
        let (flags, link_flags) = if manifest.is_package() {
            split_link_flags(&manifest.build.flags)
        } else {
            (manifest.build.flags.clone(), Vec::new())
        };
        let definitions = manifest.build.definitions.clone();

        Ok(Target {
            id: target_id(manifest, &flags, &definitions),
            display_name: self.display_name(&manifest.name),
            name: manifest.name.clone(),
            version: Some(manifest.version.clone()),
            path: Some(package.path.clone()),
            header_only: manifest.build.header_only,
            flags,
            link_flags,
            definitions,
            standard: standard(manifest)?,
        })
    }

    /// Walk the children of `node`, whose package built `parent`
    fn visit(&mut self, node: &Node, package: &Package, parent: &Target) -> ResolverResult<()> {
        let resolution = self.resolution;

        for child in &node.children {
            let edge = package.manifest.dependency(&child.name).ok_or_else(|| {
                BrickError::DependencyNotDeclared {
                    package: child.name.clone(),
                    consumer: package.manifest.name.clone(),
                }
            })?;
            let child_package = resolution.package(&child.name, &child.version).ok_or_else(|| {
                BrickError::PackageNotFound {
                    name: child.name.clone(),
                    version: Some(child.version.to_string()),
                }
            })?;

            let (target, inserted) = self.dependency_target(child_package, edge, parent)?;
            let visibility = if target.header_only || parent.header_only {
                Visibility::Interface
            } else {
                edge.options.link.unwrap_or(Visibility::Private)
            };
            self.targets.link(LinkEdge {
                from: parent.id.clone(),
                to: target.id.clone(),
                visibility,
                link_flags: edge.options.link_flags.clone(),
            });

            // An existing target already had its subtree walked
            if inserted {
                self.attach_shared_libraries(&target, &child_package.manifest);
                self.visit(child, child_package, &target)?;
            }
        }

        Ok(())
    }

    /// Target for `package` as configured by `edge`; the flag reports
    /// whether it is new to the set
    fn dependency_target(
        &mut self,
        package: &Package,
        edge: &Dependency,
        parent: &Target,
    ) -> ResolverResult<(Target, bool)> {
        let manifest = &package.manifest;
        let build = &manifest.build;

        let mut flags = build.flags.clone();
        if !build.singleton {
            flags.extend(edge.options.flags.iter().cloned());
        }

        let consumer = Consumer {
            name: &parent.name,
            supplied: &edge.options.definitions,
            definitions: &parent.definitions,
        };
        let definitions = fill_definitions(manifest, consumer, &mut self.globals)?;
        let standard = standard(manifest)?;

        let id = target_id(manifest, &flags, &definitions);
        if let Some(existing) = self.targets.get(&id) {
            debug!(target = %existing.display_name, "sharing existing target");
            return Ok((existing.clone(), false));
        }

        let target = Target {
            id,
            display_name: self.display_name(&manifest.name),
            name: manifest.name.clone(),
            version: Some(manifest.version.clone()),
            path: Some(package.path.clone()),
            header_only: build.header_only,
            flags,
            link_flags: Vec::new(),
            definitions,
            standard,
        };
        debug!(
            target = %target.display_name,
            id = %target.id.short(),
            consumer = %parent.display_name,
            "new target"
        );
        self.targets.insert(target.clone());
        Ok((target, true))
    }

    /// Add the prebuilt libraries `manifest` declares and link them from
    /// `consumer`
    fn attach_shared_libraries(&mut self, consumer: &Target, manifest: &Manifest) {
        for library in &manifest.build.shared_libraries {
            let id = shared_library_id(library);
            if !self.shared.contains(&id) {
                let target = Target {
                    id: id.clone(),
                    display_name: self.display_name(&library.name),
                    name: library.name.clone(),
                    version: None,
                    path: library.path.as_ref().map(Into::into),
                    header_only: library.header_only,
                    flags: Vec::new(),
                    link_flags: Vec::new(),
                    definitions: Definitions::default(),
                    standard: None,
                };
                self.shared.insert(target);
            }

            let visibility = if library.header_only || consumer.header_only {
                Visibility::Interface
            } else {
                library.link.unwrap_or(Visibility::Private)
            };
            self.shared.link(LinkEdge {
                from: consumer.id.clone(),
                to: id,
                visibility,
                link_flags: library.link_flags.clone(),
            });
        }
    }

    /// Next free display name for `name`: `name`, then `name_1`, `name_2`
    fn display_name(&mut self, name: &str) -> String {
        let count = self.names.entry(name.to_string()).or_insert(0);
        let display = match *count {
            0 => name.to_string(),
            n => format!("{}_{}", name, n),
        };
        *count += 1;
        display
    }
}

/// Split `-l<name>` tokens out of a mixed flag list
fn split_link_flags(flags: &[String]) -> (Vec<String>, Vec<String>) {
    flags
        .iter()
        .cloned()
        .partition(|flag| !flag.starts_with(LINK_FLAG_PREFIX))
}

fn standard(manifest: &Manifest) -> ResolverResult<Option<Standard>> {
    manifest
        .build
        .standard
        .as_deref()
        .map(|token| {
            Standard::parse(token).ok_or_else(|| BrickError::InvalidStandard {
                package: manifest.name.clone(),
                token: token.to_string(),
            })
        })
        .transpose()
}

fn target_id(manifest: &Manifest, flags: &[String], definitions: &Definitions) -> TargetId {
    let version = manifest.version.to_string();
    let mut hasher = ContentHasher::new();
    hasher
        .field(&manifest.name)
        .field(&version)
        .list(flags)
        .list(&definitions.public)
        .list(&definitions.private);
    TargetId::new(hasher.finish())
}

fn shared_library_id(library: &SharedLibrary) -> TargetId {
    let mut hasher = ContentHasher::new();
    hasher
        .field("shared")
        .field(&library.name)
        .field(library.path.as_deref().unwrap_or_default());
    TargetId::new(hasher.finish())
}
