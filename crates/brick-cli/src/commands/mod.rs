//! Command implementations and dispatch logic.
//!
//! Every command loads the project manifest, resolves it in a fresh
//! session and prints some view of the result.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use brick_config::{load_from_file, ConfigLoader, Settings, SettingsOverrides};
use brick_core::types::Manifest;
use brick_registry::{BlockingRegistry, MemoryRegistry, Registry};
use brick_resolver::{Locator, Resolution, Session};

pub mod plan;
pub mod tree;


use crate::output::{colors::ColorSupport, OutputHandler};
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    pub overrides: SettingsOverrides,
    pub offline: bool,
}

impl CommandContext {
    pub fn new(
        registry: Option<String>,
        module_cache: Option<Utf8PathBuf>,
        offline: bool,
        colors: ColorSupport,
    ) -> anyhow::Result<Self> {
        let loader = ConfigLoader::from_current_dir()?;
        Ok(Self {
            cwd: loader.cwd().to_path_buf(),
            output: OutputHandler::with_colors(colors),
            overrides: SettingsOverrides {
                registry,
                module_cache,
            },
            offline,
        })
    }
}

/// A loaded project: its manifest, directory and effective settings
pub struct Project {
    pub dir: Utf8PathBuf,
    pub manifest: Manifest,
    pub settings: Settings,
}

impl Project {
    /// Load the project at `manifest_path`, or the nearest `brick.toml` above
    /// the working directory
    pub fn load(ctx: &CommandContext, manifest_path: Option<&Utf8Path>) -> anyhow::Result<Self> {
        let path = match manifest_path {
            Some(path) => ctx.cwd.join(path),
            None => ConfigLoader::new(ctx.cwd.clone()).find_manifest()?,
        };
        let manifest =
            load_from_file(&path).with_context(|| format!("failed to load project at {}", path))?;
        let dir = path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| ctx.cwd.clone());
        let settings = ConfigLoader::new(dir.clone()).load_settings(ctx.overrides.clone())?;

        Ok(Self {
            dir,
            manifest,
            settings,
        })
    }

    pub fn locator(&self) -> Locator {
        Locator::new(
            self.settings.vendor_path(&self.dir),
            self.settings.module_cache.clone(),
        )
    }

    /// Resolve the project's dependency tree in a new session
    pub fn resolve(&self, ctx: &CommandContext) -> anyhow::Result<Resolution> {
        let registry: Box<dyn Registry> = if ctx.offline {
            ctx.output
                .warn("offline: only vendored and installed packages can resolve");
            Box::new(MemoryRegistry::new())
        } else {
            Box::new(BlockingRegistry::new(self.settings.registry.clone())?)
        };

        info!(
            project = %self.manifest.name,
            registry = %self.settings.registry,
            offline = ctx.offline,
            "resolving project"
        );
        ctx.output
            .info(&format!("Resolving dependencies of {}", self.manifest.name));
        let resolution = Session::new(registry.as_ref(), self.locator())
            .resolve_project(&self.dir, self.manifest.clone())
            .with_context(|| format!("failed to resolve dependencies of '{}'", self.manifest.name))?;
        Ok(resolution)
    }
}

/// Dispatch a command to its handler
pub fn dispatch_command(command: Commands, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Commands::Tree { manifest_path } => tree::execute(manifest_path.as_deref(), ctx),
        Commands::Plan {
            manifest_path,
            json,
        } => plan::execute(manifest_path.as_deref(), json, ctx),
    }
}
