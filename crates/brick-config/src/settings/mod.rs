//! Settings layering, manifest discovery, and environment overrides
//!
//! Tool settings are merged from four layers, lowest priority first:
//! built-in defaults, `~/.brick/config.toml`, `BRICK_*` environment
//! variables, and command-line flags.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use brick_core::error::BrickError;

use crate::toml::MANIFEST_FILE;
use crate::ConfigResult;

/// Registry used when no layer names one
pub const DEFAULT_REGISTRY: &str = "https://registry.brick.build/";

/// Vendor directory name, relative to the project root
pub const DEFAULT_VENDOR_DIR: &str = "vendor";

const ENV_REGISTRY: &str = "BRICK_REGISTRY";
const ENV_MODULE_CACHE: &str = "BRICK_MODULE_CACHE";

/// Effective tool settings after layering
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Registry base URL
    pub registry: Url,
    /// Directory installed packages are unpacked into
    pub module_cache: Utf8PathBuf,
    /// Vendor directory name inside the project
    pub vendor_dir: String,
}

/// Contents of the global config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_cache: Option<Utf8PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_dir: Option<String>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub registry: Option<String>,
    pub module_cache: Option<Utf8PathBuf>,
}

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Settings layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// Global config file
    Global(Utf8PathBuf),
    /// Environment variable
    Environment(&'static str),
    /// CLI flag
    CommandLine,
}

impl Settings {
    /// Directory holding vendored packages of the project at `project_dir`
    pub fn vendor_path(&self, project_dir: &Utf8Path) -> Utf8PathBuf {
        project_dir.join(&self.vendor_dir)
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Create a loader rooted at the process working directory
    pub fn from_current_dir() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| BrickError::io("Failed to read current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| BrickError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("Working directory is not valid UTF-8: {}", e),
        })?;
        Ok(Self::new(cwd))
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Find brick.toml (walks up directory tree)
    pub fn find_manifest(&self) -> ConfigResult<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let manifest_path = dir.join(MANIFEST_FILE);
            if manifest_path.is_file() {
                debug!(path = %manifest_path, "found manifest");
                return Ok(manifest_path);
            }
            current = dir.parent();
        }

        Err(BrickError::ManifestNotFound {
            path: self.cwd.to_string(),
        })
    }

    /// Location of the global config file
    pub fn global_config_path() -> ConfigResult<Utf8PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| BrickError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;

        let home_dir = Utf8PathBuf::try_from(home_dir).map_err(|e| BrickError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: format!("Invalid home directory path: {}", e),
        })?;

        Ok(home_dir.join(".brick").join("config.toml"))
    }

    /// Load the global config file, if any
    pub fn load_global_config(&self) -> ConfigResult<Option<(GlobalConfig, Utf8PathBuf)>> {
        let path = Self::global_config_path()?;
        if !path.is_file() {
            return Ok(None);
        }
        let config = Self::read_global_config(&path)?;
        Ok(Some((config, path)))
    }

    fn read_global_config(path: &Utf8Path) -> ConfigResult<GlobalConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BrickError::io(format!("Failed to read {}", path), e))?;
        toml::from_str(&content)
            .map_err(|e| crate::toml::toml_error(&content, path.as_str(), e.message(), e.span()))
    }

    /// Load effective settings: global file, environment, then `overrides`
    pub fn load_settings(&self, overrides: SettingsOverrides) -> ConfigResult<Settings> {
        let global = self.load_global_config()?;
        if let Some((_, path)) = &global {
            debug!(path = %path, "applying global config");
        }
        ConfigLayering::merge(global, ConfigLayering::collect_env_overrides(), overrides)
    }
}

impl ConfigLayering {
    /// Built-in defaults
    pub fn defaults() -> ConfigResult<Settings> {
        let module_cache = dirs::home_dir()
            .and_then(|home| Utf8PathBuf::try_from(home).ok())
            .map(|home| home.join(".brick").join("modules"))
            .unwrap_or_else(|| Utf8PathBuf::from(".brick/modules"));

        Ok(Settings {
            registry: parse_registry(DEFAULT_REGISTRY, &ConfigSource::Default)?,
            module_cache,
            vendor_dir: DEFAULT_VENDOR_DIR.to_string(),
        })
    }

    /// Merge multiple configuration layers
    pub fn merge(
        global: Option<(GlobalConfig, Utf8PathBuf)>,
        env_overrides: HashMap<String, String>,
        cli_overrides: SettingsOverrides,
    ) -> ConfigResult<Settings> {
        let mut settings = Self::defaults()?;

        // Apply global config as base (if present)
        if let Some((global, path)) = global {
            if let Some(registry) = global.registry {
                settings.registry = parse_registry(&registry, &ConfigSource::Global(path))?;
            }
            if let Some(module_cache) = global.module_cache {
                settings.module_cache = module_cache;
            }
            if let Some(vendor_dir) = global.vendor_dir {
                validate_vendor_dir(&vendor_dir)?;
                settings.vendor_dir = vendor_dir;
            }
        }

        // Apply environment variable overrides
        if let Some(registry) = env_overrides.get(ENV_REGISTRY) {
            settings.registry =
                parse_registry(registry, &ConfigSource::Environment(ENV_REGISTRY))?;
        }
        if let Some(module_cache) = env_overrides.get(ENV_MODULE_CACHE) {
            settings.module_cache = Utf8PathBuf::from(module_cache);
        }

        // Apply CLI flag overrides (highest priority)
        if let Some(registry) = cli_overrides.registry {
            settings.registry = parse_registry(&registry, &ConfigSource::CommandLine)?;
        }
        if let Some(module_cache) = cli_overrides.module_cache {
            settings.module_cache = module_cache;
        }

        Ok(settings)
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("BRICK_"))
            .collect()
    }
}

fn parse_registry(value: &str, source: &ConfigSource) -> ConfigResult<Url> {
    let url = Url::parse(value).map_err(|e| BrickError::ConfigValidation {
        field: "registry".to_string(),
        reason: format!("Invalid registry URL '{}' from {:?}: {}", value, source, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(BrickError::ConfigValidation {
            field: "registry".to_string(),
            reason: format!("Registry URL '{}' must use http or https", value),
        });
    }

    Ok(url)
}

fn validate_vendor_dir(value: &str) -> ConfigResult<()> {
    if value.is_empty() || !brick_core::utils::is_safe_path(std::path::Path::new(value)) {
        return Err(BrickError::ConfigValidation {
            field: "vendor_dir".to_string(),
            reason: format!("'{}' must be a relative path inside the project", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_find_manifest_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8(&temp_dir);
        std::fs::write(root.join(MANIFEST_FILE), "name = \"app\"\nversion = \"1.0.0\"\n").unwrap();

        let nested = root.join("src").join("drivers");
        std::fs::create_dir_all(&nested).unwrap();

        let loader = ConfigLoader::new(nested);
        assert_eq!(loader.find_manifest().unwrap(), root.join(MANIFEST_FILE));
    }

    #[test]
    fn test_find_manifest_missing() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(utf8(&temp_dir));

        assert!(matches!(
            loader.find_manifest(),
            Err(BrickError::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_merge_layers() {
        let global = GlobalConfig {
            registry: Some("https://global.example.com/".to_string()),
            module_cache: Some(Utf8PathBuf::from("/global/modules")),
            vendor_dir: Some("third_party".to_string()),
        };

        let env_overrides = HashMap::from([(
            ENV_MODULE_CACHE.to_string(),
            "/env/modules".to_string(),
        )]);

        let cli_overrides = SettingsOverrides {
            registry: Some("http://localhost:8080/".to_string()),
            module_cache: None,
        };

        let global = Some((global, Utf8PathBuf::from("/home/dev/.brick/config.toml")));
        let settings = ConfigLayering::merge(global, env_overrides, cli_overrides).unwrap();

        // CLI beats global, env beats global
        assert_eq!(settings.registry.as_str(), "http://localhost:8080/");
        assert_eq!(settings.module_cache, Utf8PathBuf::from("/env/modules"));
        assert_eq!(settings.vendor_dir, "third_party");
        assert_eq!(
            settings.vendor_path(Utf8Path::new("/work/app")),
            Utf8PathBuf::from("/work/app/third_party")
        );
    }

    #[test]
    fn test_defaults() {
        let settings =
            ConfigLayering::merge(None, HashMap::new(), SettingsOverrides::default()).unwrap();
        assert_eq!(settings.registry.as_str(), DEFAULT_REGISTRY);
        assert_eq!(settings.vendor_dir, DEFAULT_VENDOR_DIR);
    }

    #[test]
    fn test_invalid_registry_url() {
        let env_overrides = HashMap::from([(ENV_REGISTRY.to_string(), "not a url".to_string())]);
        let result = ConfigLayering::merge(None, env_overrides, SettingsOverrides::default());
        assert!(matches!(result, Err(BrickError::ConfigValidation { .. })));

        let cli_overrides = SettingsOverrides {
            registry: Some("ftp://example.com/".to_string()),
            module_cache: None,
        };
        let result = ConfigLayering::merge(None, HashMap::new(), cli_overrides);
        assert!(matches!(result, Err(BrickError::ConfigValidation { .. })));
    }

    #[test]
    fn test_vendor_dir_must_stay_inside_project() {
        let global = GlobalConfig {
            vendor_dir: Some("../shared".to_string()),
            ..Default::default()
        };
        let global = Some((global, Utf8PathBuf::from("config.toml")));
        let result = ConfigLayering::merge(global, HashMap::new(), SettingsOverrides::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_read_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = utf8(&temp_dir).join("config.toml");
        std::fs::write(&path, "registry = \"https://mirror.example.com/\"\n").unwrap();

        let config = ConfigLoader::read_global_config(&path).unwrap();
        assert_eq!(config.registry.as_deref(), Some("https://mirror.example.com/"));
        assert!(config.module_cache.is_none());
    }
}
