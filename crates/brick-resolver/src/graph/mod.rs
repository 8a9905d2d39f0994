//! Build target graph
//!
//! A [`TargetSet`] holds deduplicated build targets keyed by content hash,
//! plus the link edges between them. Emitters walk it through
//! [`TargetSet::build_order`], which yields dependencies before their
//! consumers.

use std::collections::HashMap;
use std::fmt;

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Serialize, Serializer};

use brick_core::error::BrickError;
use brick_core::types::{Definitions, Standard, Version, Visibility};

use crate::ResolverResult;

mod builder;
mod definitions;

pub use builder::build_plan;
pub use definitions::{fill_definitions, Consumer, Globals};

/// Content hash identifying one compiled artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One build graph vertex
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub id: TargetId,
    /// Unique within a plan: the package name, suffixed `_<n>` on repeats
    pub display_name: String,
    pub name: String,
    /// Absent for prebuilt libraries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,
    pub header_only: bool,
    /// Compile flags, own flags first and consumer-supplied flags last
    pub flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub definitions: Definitions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard: Option<Standard>,
}

/// Directed link from a consumer to what it links against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEdge {
    pub from: TargetId,
    pub to: TargetId,
    pub visibility: Visibility,
    pub link_flags: Vec<String>,
}

/// Deduplicated targets and the link edges between them
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetSet {
    #[serde(serialize_with = "serialize_targets")]
    targets: IndexMap<TargetId, Target>,
    links: Vec<LinkEdge>,
}

fn serialize_targets<S: Serializer>(
    targets: &IndexMap<TargetId, Target>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(targets.values())
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target; returns `false` when one with the same id exists
    pub fn insert(&mut self, target: Target) -> bool {
        if self.targets.contains_key(&target.id) {
            return false;
        }
        self.targets.insert(target.id.clone(), target);
        true
    }

    pub fn contains(&self, id: &TargetId) -> bool {
        self.targets.contains_key(id)
    }

    pub fn get(&self, id: &TargetId) -> Option<&Target> {
        self.targets.get(id)
    }

    /// Targets in insertion order
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Targets sharing one package name, in insertion order
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Target> + 'a {
        self.targets().filter(move |target| target.name == name)
    }

    pub fn links(&self) -> &[LinkEdge] {
        &self.links
    }

    /// Edges leaving `id`
    pub fn links_from<'a>(&'a self, id: &'a TargetId) -> impl Iterator<Item = &'a LinkEdge> + 'a {
        self.links.iter().filter(move |edge| &edge.from == id)
    }

    /// Record a link edge; repeated (from, to) pairs are kept once
    pub fn link(&mut self, edge: LinkEdge) -> bool {
        if self
            .links
            .iter()
            .any(|existing| existing.from == edge.from && existing.to == edge.to)
        {
            return false;
        }
        self.links.push(edge);
        true
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets ordered so every target comes after everything it links.
    ///
    /// Edges whose endpoints live in another set are ignored.
    pub fn build_order(&self) -> ResolverResult<Vec<&Target>> {
        use petgraph::algo::toposort;

        let mut graph: DiGraph<&Target, ()> = DiGraph::new();
        let mut index: HashMap<&TargetId, NodeIndex> = HashMap::new();
        for target in self.targets.values() {
            index.insert(&target.id, graph.add_node(target));
        }
        for edge in &self.links {
            if let (Some(from), Some(to)) = (index.get(&edge.from), index.get(&edge.to)) {
                // Dependency first: edge points from the linked target to its consumer
                graph.add_edge(*to, *from, ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|node| graph[node]).collect()),
            Err(cycle) => Err(BrickError::DependencyCycle {
                cycle: graph[cycle.node_id()].display_name.clone(),
            }),
        }
    }
}

/// Complete output of the graph builder
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// The project's own target
    pub root: TargetId,
    /// The project and every compiled dependency
    pub targets: TargetSet,
    /// Prebuilt libraries declared directly on targets
    pub shared_libraries: TargetSet,
}

impl BuildPlan {
    pub fn root_target(&self) -> Option<&Target> {
        self.targets.get(&self.root)
    }
}

#[cfg(test)]
mod tests;
