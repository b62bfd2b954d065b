//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use arbor_core::{CLI_PACKAGE, DependencyView, ProjectGraph};
use arbor_pipeline::{BuildContext, build_project_graph};

pub async fn graph(root: PathBuf, verbose: bool, json: bool, project: Option<String>) -> anyhow::Result<()> {
    let mut ctx = BuildContext::load(&root)?.with_tool_version(CLI_PACKAGE, env!("CARGO_PKG_VERSION"));
    ctx.config.verbose |= verbose;

    let output = build_project_graph(&ctx).await?;
    for failure in &output.plugin_failures {
        tracing::error!("Plugin \"{}\" failed: {}", failure.plugin, failure.message);
    }

    if json {
        let rendered = serde_json::to_string_pretty(&output.graph).context("Failed to serialize project graph")?;
        println!("{rendered}");
        return Ok(());
    }

    let view = DependencyView::new(&output.graph);
    match project {
        Some(name) => print_project(&output.graph, &view, &name)?,
        None => print_summary(&output.graph, &view),
    }

    if !output.stats.cache_written && ctx.cache_enabled() {
        tracing::warn!("Project graph cache was not updated");
    }
    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    let ctx = BuildContext::load(&root)?;
    tracing::info!("Clearing cache at: {}", ctx.cache.dir().display());

    ctx.cache.clear().context("Failed to clear project graph cache")?;

    tracing::info!("Cache cleared");
    Ok(())
}

fn print_summary(graph: &ProjectGraph, view: &DependencyView) {
    println!(
        "{} projects, {} external packages, {} dependencies",
        graph.nodes.len(),
        graph.external_nodes.len(),
        graph.edge_count()
    );
    for (name, node) in &graph.nodes {
        let direct: Vec<&str> = graph
            .dependencies_of(name)
            .iter()
            .map(|d| d.target.as_str())
            .collect();
        println!("  {name} ({:?}, {} files) -> [{}]", node.kind, node.files.len(), direct.join(", "));
    }
    if view.has_project_cycle() {
        println!("warning: circular dependency between workspace projects");
    }
}

fn print_project(graph: &ProjectGraph, view: &DependencyView, name: &str) -> anyhow::Result<()> {
    if !graph.contains(name) {
        anyhow::bail!("Unknown project: {}", name);
    }
    println!("{name}");
    println!("  depends on: {}", join(view.transitive_dependencies(name)));
    println!("  used by:    {}", join(view.dependents(name)));
    Ok(())
}

fn join(names: impl IntoIterator<Item = String>) -> String {
    let names: Vec<String> = names.into_iter().collect();
    if names.is_empty() { "-".to_string() } else { names.join(", ") }
}
