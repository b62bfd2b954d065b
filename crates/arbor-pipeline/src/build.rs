//! Project graph construction

use std::time::Instant;

use anyhow::{Context, Result};
use arbor_core::{
    CacheSnapshot, FileDiff, Fingerprint, ProjectFileMap, ProjectGraph, ProjectGraphBuilder, ProjectNode,
    SCHEMA_VERSION,
};
use arbor_indexer::ExtractionCoordinator;
use arbor_plugins::{PluginFailure, PluginPipeline, ProcessorContext};

use crate::context::BuildContext;
use crate::implicit::add_implicit_dependencies;
use crate::lock_merger::LockGraphMerger;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files_total: usize,
    pub files_processed: usize,
    pub files_reused: usize,
    /// Cached per-file deps were discarded.
    pub full_recompute: bool,
    pub cache_written: bool,
}

#[derive(Debug)]
pub struct BuildOutput {
    pub graph: ProjectGraph,
    /// Plugin failures, reported in verbose mode only.
    pub plugin_failures: Vec<PluginFailure>,
    pub stats: BuildStats,
}

/// Scan the workspace and build its project graph, reusing the cache when possible.
pub async fn build_project_graph(ctx: &BuildContext) -> Result<BuildOutput> {
    let file_map = ctx
        .scanner
        .scan(&ctx.root, &ctx.config)
        .context("Failed to scan workspace files")?;

    let cached = if ctx.cache_enabled() { ctx.cache.load() } else { None };
    build_project_graph_using_file_map(ctx, file_map, cached).await
}

/// Build from an already scanned file map and an optional cached snapshot.
///
/// Fatal errors return before anything is written, so the previous cache
/// stays on disk untouched.
pub async fn build_project_graph_using_file_map(
    ctx: &BuildContext,
    file_map: ProjectFileMap,
    cached: Option<CacheSnapshot>,
) -> Result<BuildOutput> {
    let started = Instant::now();
    let merger = LockGraphMerger::new(ctx.lock_parser.as_ref());

    let lock_file_hash = merger
        .lock_file_hash(&ctx.root)
        .context("Failed to hash lock file")?;
    let fingerprint = Fingerprint::new(&ctx.config, &ctx.tool_versions, lock_file_hash.as_str());

    let (diff, full_recompute) = match &cached {
        Some(snapshot) if !snapshot.is_stale(&fingerprint, &ctx.config.projects) => (snapshot.diff(&file_map), false),
        Some(_) => {
            tracing::debug!("Cached project graph is stale, recomputing everything");
            (FileDiff::full(&file_map), true)
        }
        None => (FileDiff::full(&file_map), true),
    };

    let mut builder = ProjectGraphBuilder::new();
    if let Some(partial) = merger
        .resolve(&ctx.root, &lock_file_hash, cached.as_ref())
        .context("Failed to read external dependencies from lock file")?
    {
        builder.merge(partial);
    }
    builder.set_version(SCHEMA_VERSION);

    for (name, project) in &ctx.config.projects {
        builder.add_node(ProjectNode {
            name: name.clone(),
            kind: project.kind,
            root: project.root.clone(),
            files: file_map.get(name).cloned().unwrap_or_default(),
            tags: project.tags.clone(),
        });
    }

    let plugins = ctx
        .plugin_loader
        .load(&ctx.config.plugins)
        .context("Failed to load plugins")?;
    let processor_context = ProcessorContext {
        workspace: &ctx.config,
        file_map: &file_map,
        files_to_process: &diff.files_to_process,
    };
    let output = PluginPipeline::new(plugins)
        .verbose(ctx.verbose())
        .run(builder.get_updated_project_graph(), &processor_context)
        .await;
    let mut builder = ProjectGraphBuilder::from_graph(output.graph);

    let mut files_reused = 0;
    for (project, files) in &diff.cached_file_data {
        for (file, data) in files {
            files_reused += 1;
            if let Some(deps) = &data.deps {
                builder.restore_file_dependencies(project, file, deps);
            }
        }
    }

    let coordinator = ExtractionCoordinator::new(ctx.extractor.clone(), ctx.config.max_workers);
    let explicit = coordinator
        .extract(builder.get_updated_project_graph(), diff.files_to_process.clone())
        .await
        .context("Unable to complete project graph creation")?;
    for dep in &explicit {
        builder.add_explicit_dependency(&dep.source_project_name, &dep.source_project_file, &dep.target_project_name)?;
    }

    add_implicit_dependencies(&mut builder, &ctx.config.projects)?;

    let graph = builder.build();

    let cache_written = ctx.cache_enabled() && ctx.cache.persist(&graph, &fingerprint);

    let stats = BuildStats {
        files_total: file_map.values().map(Vec::len).sum(),
        files_processed: diff.files_to_process_count(),
        files_reused,
        full_recompute,
        cache_written,
    };
    tracing::info!(
        "Built project graph in {:?}: {} projects, {} external nodes, {} edges ({} files analyzed, {} reused)",
        started.elapsed(),
        graph.nodes.len(),
        graph.external_nodes.len(),
        graph.edge_count(),
        stats.files_processed,
        stats.files_reused
    );

    Ok(BuildOutput {
        graph,
        plugin_failures: output.failures,
        stats,
    })
}
