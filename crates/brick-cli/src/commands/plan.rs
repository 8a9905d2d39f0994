//! `brick plan` command implementation.
//!
//! Prints targets in build order (dependencies first) with their flags and
//! definitions, then the link edges and prebuilt libraries.

use std::fmt::Write as _;

use camino::Utf8Path;

use brick_resolver::{build_plan, BuildPlan, ResolverResult, Target, TargetId, TargetSet};

use super::{CommandContext, Project};

/// Execute the `brick plan` command
pub fn execute(manifest_path: Option<&Utf8Path>, json: bool, ctx: &CommandContext) -> anyhow::Result<()> {
    let project = Project::load(ctx, manifest_path)?;
    let resolution = project.resolve(ctx)?;
    let plan = build_plan(&resolution)?;

    if json {
        let mut text = serde_json::to_string_pretty(&plan)?;
        text.push('\n');
        ctx.output.print(&text);
    } else {
        ctx.output.print(&render(&plan)?);
    }

    ctx.output.success(&format!(
        "Planned {} target(s) and {} prebuilt librar{}",
        plan.targets.len(),
        plan.shared_libraries.len(),
        if plan.shared_libraries.len() == 1 { "y" } else { "ies" }
    ));
    Ok(())
}

/// Human-readable plan listing
pub fn render(plan: &BuildPlan) -> ResolverResult<String> {
    let mut out = String::new();

    out.push_str("targets:\n");
    for target in plan.targets.build_order()? {
        render_target(&mut out, target);
    }

    if !plan.targets.links().is_empty() {
        out.push_str("links:\n");
        render_links(&mut out, &plan.targets, &plan.targets);
    }

    if !plan.shared_libraries.is_empty() {
        out.push_str("prebuilt:\n");
        for library in plan.shared_libraries.targets() {
            let path = library.path.as_ref().map(|p| p.as_str()).unwrap_or("(system)");
            let _ = writeln!(out, "  {} {}", library.display_name, path);
        }
        render_links(&mut out, &plan.targets, &plan.shared_libraries);
    }

    Ok(out)
}

fn render_target(out: &mut String, target: &Target) {
    let version = target
        .version
        .as_ref()
        .map(|v| format!("@{}", v))
        .unwrap_or_default();
    let header_only = if target.header_only { " (header-only)" } else { "" };
    let _ = writeln!(
        out,
        "  {} [{}{}] {}{}",
        target.display_name,
        target.name,
        version,
        target.id.short(),
        header_only
    );

    if let Some(standard) = target.standard {
        let _ = writeln!(out, "    std: {}", standard);
    }
    if !target.flags.is_empty() {
        let _ = writeln!(out, "    flags: {}", target.flags.join(" "));
    }
    if !target.link_flags.is_empty() {
        let _ = writeln!(out, "    link flags: {}", target.link_flags.join(" "));
    }
    if !target.definitions.public.is_empty() {
        let _ = writeln!(out, "    public: {}", target.definitions.public.join(" "));
    }
    if !target.definitions.private.is_empty() {
        let _ = writeln!(out, "    private: {}", target.definitions.private.join(" "));
    }
}

/// Link edges of `edges`, consumer names looked up in `consumers`
fn render_links(out: &mut String, consumers: &TargetSet, edges: &TargetSet) {
    for edge in edges.links() {
        let visibility = format!("{:?}", edge.visibility).to_lowercase();
        let _ = write!(
            out,
            "  {} -> {} ({})",
            display_name(consumers, &edge.from),
            display_name(edges, &edge.to),
            visibility
        );
        if !edge.link_flags.is_empty() {
            let _ = write!(out, " {}", edge.link_flags.join(" "));
        }
        out.push('\n');
    }
}

fn display_name(set: &TargetSet, id: &TargetId) -> String {
    set.get(id)
        .map(|target| target.display_name.clone())
        .unwrap_or_else(|| id.short().to_string())
}
