//! brick.toml manifest parsing and serialization

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use brick_core::error::BrickError;
use brick_core::types::{
    parse_constraint, BuildOptions, DependencyList, DependencySpec, DetailedSpec, Manifest,
    ProjectType, Standard, Version,
};

use crate::ConfigResult;

/// Fixed manifest file name inside every project and package directory
pub const MANIFEST_FILE: &str = "brick.toml";

/// brick.toml as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrickToml {
    /// Declared project type
    #[serde(rename = "type", default)]
    pub kind: ProjectType,

    /// Package name (required)
    pub name: String,

    /// Package version (required, strict)
    pub version: String,

    /// Declared dependencies, table or shorthand list
    #[serde(default)]
    pub dependencies: DependencyList,

    /// Compile-option schema
    #[serde(default)]
    pub build: BuildOptions,
}

impl BrickToml {
    /// Validate and normalize into the canonical manifest
    pub fn into_manifest(self) -> ConfigResult<Manifest> {
        validate_name("name", &self.name)?;
        let version = Version::parse(&self.version)?;
        validate_dependency_sources(&self.dependencies)?;

        let dependencies = self.dependencies.normalize()?;
        for (name, dependency) in &dependencies {
            validate_name(&format!("dependencies.{}", name), name)?;
            parse_constraint(&dependency.constraint)?;
        }

        if let Some(token) = &self.build.standard {
            if Standard::parse(token).is_none() {
                return Err(BrickError::InvalidStandard {
                    package: self.name.clone(),
                    token: token.clone(),
                });
            }
        }

        Ok(Manifest {
            kind: self.kind,
            name: self.name,
            version,
            dependencies,
            build: self.build,
        })
    }
}

impl From<&Manifest> for BrickToml {
    fn from(manifest: &Manifest) -> Self {
        Self {
            kind: manifest.kind,
            name: manifest.name.clone(),
            version: manifest.version.to_string(),
            dependencies: DependencyList::from_dependencies(manifest.dependencies.values()),
            build: manifest.build.clone(),
        }
    }
}

/// Parse TOML string to BrickToml
pub fn parse_brick_toml(content: &str) -> ConfigResult<BrickToml> {
    parse_document(content, MANIFEST_FILE)
}

/// Parse and validate a manifest held in memory
pub fn parse_manifest(content: &str) -> ConfigResult<Manifest> {
    parse_brick_toml(content)?.into_manifest()
}

fn parse_document(content: &str, file: &str) -> ConfigResult<BrickToml> {
    // First pass with toml_edit for syntax errors with locations
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| toml_error(content, file, e.message(), e.span()))?;

    // Then parse with serde for type safety
    toml::from_str(content).map_err(|e| toml_error(content, file, e.message(), e.span()))
}

pub(crate) fn toml_error(
    content: &str,
    file: &str,
    message: &str,
    span: Option<std::ops::Range<usize>>,
) -> BrickError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));
    BrickError::TomlParse {
        file: file.to_string(),
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let prefix = content.get(..offset).unwrap_or(content);
    let line = prefix.matches('\n').count() + 1;
    let line_start = prefix.rfind('\n').map_or(0, |index| index + 1);
    let column = prefix[line_start..].chars().count() + 1;
    (line, column)
}

/// Serialize BrickToml to TOML string
pub fn serialize_brick_toml(config: &BrickToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| BrickError::ConfigValidation {
        field: "manifest".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

/// Load and validate a manifest file
pub fn load_from_file(path: &Utf8Path) -> ConfigResult<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BrickError::ManifestNotFound {
                path: path.parent().unwrap_or(path).to_string(),
            }
        } else {
            BrickError::io(format!("Failed to read {}", path), e)
        }
    })?;

    debug!(path = %path, "parsing manifest");
    parse_document(&content, path.as_str())?.into_manifest()
}

/// Read the manifest of the package directory `dir`
pub fn read_manifest(dir: &Utf8Path) -> ConfigResult<Manifest> {
    load_from_file(&dir.join(MANIFEST_FILE))
}

/// Write `manifest` as `dir/brick.toml`, returning the file path
pub fn write_manifest(dir: &Utf8Path, manifest: &Manifest) -> ConfigResult<Utf8PathBuf> {
    let path = dir.join(MANIFEST_FILE);
    let content = serialize_brick_toml(&BrickToml::from(manifest))?;
    std::fs::write(&path, content)
        .map_err(|e| BrickError::io(format!("Failed to write {}", path), e))?;
    Ok(path)
}

fn validate_name(field: &str, name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(BrickError::ConfigValidation {
            field: field.to_string(),
            reason: "package name is required".to_string(),
        });
    }

    if !Manifest::is_valid_name(name) {
        return Err(BrickError::ConfigValidation {
            field: field.to_string(),
            reason: format!(
                "invalid package name '{}'. Names may contain letters, digits, '-', '_' and '.'",
                name
            ),
        });
    }

    Ok(())
}

/// Detailed entries need a version unless they come from the vendor directory
fn validate_dependency_sources(dependencies: &DependencyList) -> ConfigResult<()> {
    let detailed: Vec<(Option<&str>, &DetailedSpec)> = match dependencies {
        DependencyList::Table(table) => table
            .iter()
            .filter_map(|(key, spec)| match spec {
                DependencySpec::Detailed(detailed) => Some((Some(key.as_str()), detailed)),
                DependencySpec::Simple(_) => None,
            })
            .collect(),
        DependencyList::List(list) => list
            .iter()
            .filter_map(|spec| match spec {
                DependencySpec::Detailed(detailed) => Some((None, detailed)),
                DependencySpec::Simple(_) => None,
            })
            .collect(),
    };

    for (key, spec) in detailed {
        if spec.version.is_none() && !spec.vendor {
            let name = key.or(spec.name.as_deref()).unwrap_or("<unnamed>");
            return Err(BrickError::ConfigValidation {
                field: format!("dependencies.{}", name),
                reason: "entry must specify a `version` or set `vendor = true`".to_string(),
            });
        }
    }

    Ok(())
}
