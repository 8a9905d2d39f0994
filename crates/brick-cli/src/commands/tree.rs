//! `brick tree` command implementation.

use camino::Utf8Path;

use super::{CommandContext, Project};

/// Execute the `brick tree` command
pub fn execute(manifest_path: Option<&Utf8Path>, ctx: &CommandContext) -> anyhow::Result<()> {
    let project = Project::load(ctx, manifest_path)?;
    let resolution = project.resolve(ctx)?;

    ctx.output.print(&resolution.root.render());
    ctx.output.success(&format!(
        "Resolved {} package(s) for {}",
        resolution
            .packages
            .keys()
            .filter(|id| id.name != project.manifest.name)
            .count(),
        project.manifest.name
    ));
    Ok(())
}
