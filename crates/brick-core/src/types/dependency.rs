//! Dependency specification types.
//!
//! Manifests may declare dependencies in several shorthand forms. They are
//! all normalized into the canonical [`Dependency`] before any resolution
//! logic sees them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BrickError, BrickResult};

/// Link visibility of an edge in the build graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Interface,
}

/// Per-edge build configuration a consumer attaches to a dependency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyOptions {
    /// Extra compile flags, appended after the dependency's own
    pub flags: Vec<String>,
    /// Definitions handed to the dependency (matched against its
    /// required/optional templates); may contain `${KEY}` placeholders
    pub definitions: Vec<String>,
    /// Requested link visibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Visibility>,
    /// Extra linker flags on this edge
    pub link_flags: Vec<String>,
}

/// Canonical dependency declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// Constraint exactly as written by the consumer
    pub constraint: String,
    /// Must come from the local vendor directory
    pub vendor: bool,
    pub options: DependencyOptions,
}

/// Dependency entry as written in a manifest (string or table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// `"^1.2"` in a table, `"name"` or `"name@^1.2"` in a list
    Simple(String),
    /// Detailed dependency specification
    Detailed(DetailedSpec),
}

/// Table form of a dependency entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedSpec {
    /// Required in list form, optional (must match the key) in table form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub vendor: bool,
    #[serde(flatten)]
    pub options: DependencyOptions,
}

/// A manifest's dependency section: a name-keyed table or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyList {
    Table(IndexMap<String, DependencySpec>),
    List(Vec<DependencySpec>),
}

impl Default for DependencyList {
    fn default() -> Self {
        DependencyList::Table(IndexMap::new())
    }
}

const ANY_VERSION: &str = "*";

impl Dependency {
    /// Create a dependency on `name` with default options
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
            vendor: false,
            options: DependencyOptions::default(),
        }
    }

    /// Mark this dependency as vendor-only
    pub fn vendored(mut self) -> Self {
        self.vendor = true;
        self
    }

    pub fn with_options(mut self, options: DependencyOptions) -> Self {
        self.options = options;
        self
    }
}

fn invalid(field: &str, reason: String) -> BrickError {
    BrickError::ConfigValidation {
        field: field.to_string(),
        reason,
    }
}

impl DependencySpec {
    /// Normalize a table entry whose key is the dependency name
    pub fn into_keyed(self, key: &str) -> BrickResult<Dependency> {
        match self {
            DependencySpec::Simple(constraint) => Ok(Dependency::new(key, constraint)),
            DependencySpec::Detailed(detailed) => {
                if let Some(name) = &detailed.name {
                    if name != key {
                        return Err(invalid(
                            &format!("dependencies.{}", key),
                            format!("entry names a different package '{}'", name),
                        ));
                    }
                }
                Ok(detailed.into_dependency(key.to_string()))
            },
        }
    }

    /// Normalize a list entry: `"name"`, `"name@constraint"` or a table
    /// carrying its own `name`
    pub fn into_unkeyed(self) -> BrickResult<Dependency> {
        match self {
            DependencySpec::Simple(entry) => {
                let (name, constraint) = match entry.split_once('@') {
                    Some((name, constraint)) => (name.trim(), constraint.trim()),
                    None => (entry.trim(), ANY_VERSION),
                };
                if name.is_empty() {
                    return Err(invalid(
                        "dependencies",
                        format!("entry '{}' has no package name", entry),
                    ));
                }
                Ok(Dependency::new(name, constraint))
            },
            DependencySpec::Detailed(mut detailed) => {
                let name = detailed.name.take().ok_or_else(|| {
                    invalid("dependencies", "list entries need a `name`".to_string())
                })?;
                Ok(detailed.into_dependency(name))
            },
        }
    }
}

impl DetailedSpec {
    fn into_dependency(self, name: String) -> Dependency {
        Dependency {
            name,
            constraint: self.version.unwrap_or_else(|| ANY_VERSION.to_string()),
            vendor: self.vendor,
            options: self.options,
        }
    }
}

impl DependencyList {
    /// Table form of canonical dependencies, every entry written out in full
    pub fn from_dependencies<'a, I>(dependencies: I) -> Self
    where
        I: IntoIterator<Item = &'a Dependency>,
    {
        let table = dependencies
            .into_iter()
            .map(|dependency| {
                let spec = DependencySpec::Detailed(DetailedSpec {
                    name: None,
                    version: Some(dependency.constraint.clone()),
                    vendor: dependency.vendor,
                    options: dependency.options.clone(),
                });
                (dependency.name.clone(), spec)
            })
            .collect();
        DependencyList::Table(table)
    }

    /// Normalize into canonical dependencies keyed by name, preserving
    /// declaration order
    pub fn normalize(self) -> BrickResult<IndexMap<String, Dependency>> {
        let dependencies = match self {
            DependencyList::Table(table) => table
                .into_iter()
                .map(|(key, spec)| spec.into_keyed(&key))
                .collect::<BrickResult<Vec<_>>>()?,
            DependencyList::List(list) => list
                .into_iter()
                .map(DependencySpec::into_unkeyed)
                .collect::<BrickResult<Vec<_>>>()?,
        };

        let mut normalized = IndexMap::with_capacity(dependencies.len());
        for dependency in dependencies {
            let name = dependency.name.clone();
            if normalized.insert(name.clone(), dependency).is_some() {
                return Err(invalid(
                    "dependencies",
                    format!("'{}' is declared more than once", name),
                ));
            }
        }
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_shorthand() {
        let list = DependencyList::List(vec![
            DependencySpec::Simple("fmt".to_string()),
            DependencySpec::Simple("spdlog@^1.12".to_string()),
            DependencySpec::Detailed(DetailedSpec {
                name: Some("zlib".to_string()),
                version: Some("1.3.0".to_string()),
                vendor: true,
                ..Default::default()
            }),
        ]);

        let deps = list.normalize().unwrap();
        let names: Vec<_> = deps.keys().cloned().collect();
        assert_eq!(names, vec!["fmt", "spdlog", "zlib"]);
        assert_eq!(deps["fmt"].constraint, "*");
        assert_eq!(deps["spdlog"].constraint, "^1.12");
        assert!(deps["zlib"].vendor);
        assert_eq!(deps["zlib"].constraint, "1.3.0");
    }

    #[test]
    fn test_table_form() {
        let mut table = IndexMap::new();
        table.insert("fmt".to_string(), DependencySpec::Simple("^10".to_string()));
        table.insert(
            "led".to_string(),
            DependencySpec::Detailed(DetailedSpec {
                options: DependencyOptions {
                    definitions: vec!["PIN=13".to_string()],
                    link: Some(Visibility::Public),
                    ..Default::default()
                },
                ..Default::default()
            }),
        );

        let deps = DependencyList::Table(table).normalize().unwrap();
        assert_eq!(deps["fmt"], Dependency::new("fmt", "^10"));
        assert_eq!(deps["led"].constraint, "*");
        assert_eq!(deps["led"].options.link, Some(Visibility::Public));
    }

    #[test]
    fn test_invalid_entries() {
        let list = DependencyList::List(vec![DependencySpec::Detailed(DetailedSpec::default())]);
        assert!(list.normalize().is_err());

        let list = DependencyList::List(vec![DependencySpec::Simple("@1.0".to_string())]);
        assert!(list.normalize().is_err());

        let list = DependencyList::List(vec![
            DependencySpec::Simple("fmt".to_string()),
            DependencySpec::Simple("fmt@1.0.0".to_string()),
        ]);
        assert!(list.normalize().is_err());

        let mut table = IndexMap::new();
        table.insert(
            "fmt".to_string(),
            DependencySpec::Detailed(DetailedSpec {
                name: Some("other".to_string()),
                ..Default::default()
            }),
        );
        assert!(DependencyList::Table(table).normalize().is_err());
    }
}
