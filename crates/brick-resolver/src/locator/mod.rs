//! Local package locator
//!
//! Packages may be present on disk before any registry is consulted:
//!
//! 1. `vendor/<name>`, an unversioned override checked into the project
//! 2. `vendor/<name>__<version>`, a version-qualified vendor copy
//! 3. `<module-cache>/<name>__<version>`, an installed package
//!
//! Candidates are probed in that order and the first hit wins.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::debug;

use brick_config::toml::read_manifest;
use brick_core::error::BrickError;
use brick_core::types::{Manifest, Version};
use brick_core::utils::safe_join;

use crate::ResolverResult;

/// Separator between name and version in versioned package directories
const VERSION_SEPARATOR: &str = "__";

/// Unique identifier for a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageId {
    pub name: String,
    pub version: Version,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Where a located package came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageSource {
    /// The project being built
    Root,
    /// The project's vendor directory
    Vendor,
    /// An installed copy in the module cache
    ModuleCache,
    /// Registry metadata; installed under the module cache by the installer
    Registry,
}

/// A located, concrete package
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub manifest: Manifest,
    pub path: Utf8PathBuf,
    pub source: PackageSource,
}

impl Package {
    pub fn new(manifest: Manifest, path: Utf8PathBuf, source: PackageSource) -> Self {
        Self {
            manifest,
            path,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> &Version {
        &self.manifest.version
    }

    pub fn id(&self) -> PackageId {
        PackageId::new(self.manifest.name.clone(), self.manifest.version.clone())
    }

    /// Whether the package came from disk rather than the registry
    pub fn is_local(&self) -> bool {
        self.source != PackageSource::Registry
    }
}

/// Filesystem search over the vendor directory and module cache
#[derive(Debug, Clone)]
pub struct Locator {
    vendor_dir: Utf8PathBuf,
    module_cache: Utf8PathBuf,
}

impl Locator {
    pub fn new(vendor_dir: impl Into<Utf8PathBuf>, module_cache: impl Into<Utf8PathBuf>) -> Self {
        Self {
            vendor_dir: vendor_dir.into(),
            module_cache: module_cache.into(),
        }
    }

    pub fn vendor_dir(&self) -> &Utf8Path {
        &self.vendor_dir
    }

    pub fn module_cache(&self) -> &Utf8Path {
        &self.module_cache
    }

    /// Directory a package version is installed into
    pub fn module_cache_path(&self, name: &str, version: &Version) -> ResolverResult<Utf8PathBuf> {
        join(&self.module_cache, &versioned_dir(name, version))
    }

    /// Find `name@version` on disk.
    ///
    /// With `strict`, an unversioned vendor override must carry exactly the
    /// requested version; otherwise a mismatched override is skipped. Returns
    /// `None` when no candidate directory exists.
    pub fn find(
        &self,
        name: &str,
        version: &Version,
        strict: bool,
    ) -> ResolverResult<Option<Package>> {
        let unversioned = join(&self.vendor_dir, name)?;
        if unversioned.is_dir() {
            let manifest = read_package_manifest(&unversioned, name)?;
            if same_version(&manifest.version, version) {
                debug!(package = %name, path = %unversioned, "using vendor override");
                return Ok(Some(Package::new(manifest, unversioned, PackageSource::Vendor)));
            }
            if strict {
                return Err(version_mismatch(name, version, &manifest, &unversioned));
            }
            debug!(
                package = %name,
                requested = %version,
                found = %manifest.version,
                "skipping vendor override with another version"
            );
        }

        let candidates = [
            (&self.vendor_dir, PackageSource::Vendor),
            (&self.module_cache, PackageSource::ModuleCache),
        ];
        for (base, source) in candidates {
            let path = join(base, &versioned_dir(name, version))?;
            if !path.is_dir() {
                continue;
            }
            let manifest = read_package_manifest(&path, name)?;
            if !same_version(&manifest.version, version) {
                return Err(version_mismatch(name, version, &manifest, &path));
            }
            debug!(package = %name, version = %version, path = %path, "found local package");
            return Ok(Some(Package::new(manifest, path, source)));
        }

        Ok(None)
    }

    /// Versions of `name` available on disk, ascending.
    ///
    /// Covers the unversioned vendor override and every versioned vendor
    /// directory; with `include_cache`, installed module-cache copies too.
    pub fn local_versions(&self, name: &str, include_cache: bool) -> ResolverResult<Vec<Version>> {
        let mut versions = Vec::new();

        let unversioned = join(&self.vendor_dir, name)?;
        if unversioned.is_dir() {
            versions.push(read_package_manifest(&unversioned, name)?.version);
        }

        versions.extend(scan_versioned(&self.vendor_dir, name)?);
        if include_cache {
            versions.extend(scan_versioned(&self.module_cache, name)?);
        }

        versions.sort();
        versions.dedup();
        Ok(versions)
    }
}

fn versioned_dir(name: &str, version: &Version) -> String {
    format!("{}{}{}", name, VERSION_SEPARATOR, version)
}

fn join(base: &Utf8Path, relative: &str) -> ResolverResult<Utf8PathBuf> {
    let joined = safe_join(base.as_std_path(), Path::new(relative))?;
    Utf8PathBuf::from_path_buf(joined).map_err(|path| BrickError::PathTraversal {
        path: path.display().to_string(),
    })
}

fn same_version(found: &Version, requested: &Version) -> bool {
    found.cmp_precedence(requested) == Ordering::Equal
}

/// Versions encoded in `<name>__<version>` directory names under `dir`
fn scan_versioned(dir: &Utf8Path, name: &str) -> ResolverResult<Vec<Version>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(BrickError::io(format!("Failed to read {}", dir), e)),
    };

    let prefix = format!("{}{}", name, VERSION_SEPARATOR);
    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BrickError::io(format!("Failed to read {}", dir), e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(suffix) = file_name.to_str().and_then(|n| n.strip_prefix(prefix.as_str())) else {
            continue;
        };
        if let Ok(version) = Version::parse(suffix) {
            versions.push(version);
        }
    }
    Ok(versions)
}

/// Read a candidate's manifest and check it is the package we asked for
fn read_package_manifest(path: &Utf8Path, name: &str) -> ResolverResult<Manifest> {
    let manifest = read_manifest(path)?;

    if manifest.name != name {
        return Err(BrickError::NameMismatch {
            expected: name.to_string(),
            found: manifest.name,
            path: path.to_string(),
        });
    }

    // Only publishable packages may appear inside a dependency tree
    if !manifest.is_package() {
        return Err(BrickError::WrongProjectType {
            package: name.to_string(),
            path: path.to_string(),
        });
    }

    Ok(manifest)
}

fn version_mismatch(
    name: &str,
    requested: &Version,
    manifest: &Manifest,
    path: &Utf8Path,
) -> BrickError {
    BrickError::VersionMismatch {
        package: name.to_string(),
        expected: requested.to_string(),
        found: manifest.version.to_string(),
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brick_config::toml::write_manifest;
    use brick_core::types::ProjectType;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
            Self { _temp: temp, root }
        }

        fn locator(&self) -> Locator {
            Locator::new(self.root.join("vendor"), self.root.join("modules"))
        }

        fn write(&self, dir: &str, kind: ProjectType, name: &str, version: Version) {
            let path = self.root.join(dir);
            std::fs::create_dir_all(&path).unwrap();
            write_manifest(&path, &Manifest::new(kind, name, version)).unwrap();
        }

        fn package(&self, dir: &str, name: &str, version: Version) {
            self.write(dir, ProjectType::Package, name, version);
        }
    }

    #[test]
    fn test_nothing_on_disk() {
        let fixture = Fixture::new();
        let found = fixture.locator().find("foo", &Version::new(1, 0, 0), false).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_local_override_precedence() {
        let fixture = Fixture::new();
        fixture.package("vendor/foo", "foo", Version::new(2, 0, 0));
        fixture.package("modules/foo__1.0.0", "foo", Version::new(1, 0, 0));
        let locator = fixture.locator();

        // Mismatched override is skipped under non-strict lookup
        let found = locator.find("foo", &Version::new(1, 0, 0), false).unwrap().unwrap();
        assert_eq!(found.source, PackageSource::ModuleCache);
        assert_eq!(found.path, fixture.root.join("modules/foo__1.0.0"));

        let found = locator.find("foo", &Version::new(2, 0, 0), false).unwrap().unwrap();
        assert_eq!(found.source, PackageSource::Vendor);
        assert_eq!(found.path, fixture.root.join("vendor/foo"));
    }

    #[test]
    fn test_strict_override_mismatch_is_an_error() {
        let fixture = Fixture::new();
        fixture.package("vendor/foo", "foo", Version::new(2, 0, 0));

        let result = fixture.locator().find("foo", &Version::new(1, 0, 0), true);
        assert!(matches!(result, Err(BrickError::VersionMismatch { .. })));
    }

    #[test]
    fn test_versioned_vendor_before_module_cache() {
        let fixture = Fixture::new();
        fixture.package("vendor/bar__1.2.0", "bar", Version::new(1, 2, 0));
        fixture.package("modules/bar__1.2.0", "bar", Version::new(1, 2, 0));

        let found = fixture.locator().find("bar", &Version::new(1, 2, 0), true).unwrap().unwrap();
        assert_eq!(found.source, PackageSource::Vendor);
        assert!(found.is_local());
        assert_eq!(found.id().to_string(), "bar@1.2.0");
    }

    #[test]
    fn test_manifest_disagreements() {
        let fixture = Fixture::new();
        fixture.package("vendor/baz", "other", Version::new(1, 0, 0));
        fixture.package("modules/qux__1.0.0", "qux", Version::new(1, 0, 1));
        fixture.write("vendor/app", ProjectType::Application, "app", Version::new(1, 0, 0));
        let locator = fixture.locator();

        assert!(matches!(
            locator.find("baz", &Version::new(1, 0, 0), false),
            Err(BrickError::NameMismatch { .. })
        ));
        assert!(matches!(
            locator.find("qux", &Version::new(1, 0, 0), false),
            Err(BrickError::VersionMismatch { .. })
        ));
        assert!(matches!(
            locator.find("app", &Version::new(1, 0, 0), false),
            Err(BrickError::WrongProjectType { .. })
        ));
    }

    #[test]
    fn test_rejects_traversal_names() {
        let fixture = Fixture::new();
        let result = fixture.locator().find("../etc", &Version::new(1, 0, 0), false);
        assert!(matches!(result, Err(BrickError::PathTraversal { .. })));
    }

    #[test]
    fn test_local_versions() {
        let fixture = Fixture::new();
        fixture.package("vendor/zlib", "zlib", Version::new(1, 3, 0));
        fixture.package("vendor/zlib__1.2.13", "zlib", Version::new(1, 2, 13));
        fixture.package("modules/zlib__1.3.1", "zlib", Version::new(1, 3, 1));
        fixture.package("vendor/zlibx__9.0.0", "zlibx", Version::new(9, 0, 0));
        let locator = fixture.locator();

        assert_eq!(
            locator.local_versions("zlib", false).unwrap(),
            vec![Version::new(1, 2, 13), Version::new(1, 3, 0)]
        );
        assert_eq!(
            locator.local_versions("zlib", true).unwrap(),
            vec![Version::new(1, 2, 13), Version::new(1, 3, 0), Version::new(1, 3, 1)]
        );
        assert!(locator.local_versions("boost", true).unwrap().is_empty());
    }
}
