//! Integration tests for Arbor
//!
//! These run the whole graph build against temporary workspaces on disk.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arbor_core::test_utils::{create_workspace, generated_sources};
use arbor_core::{CORE_PACKAGE, DependencyKind, GRAPH_CACHE, ProjectFileMap, ProjectGraph};
use arbor_indexer::{DependencyExtractor, ExplicitDependency, SourceDependencyExtractor};
use arbor_pipeline::{BuildContext, build_project_graph};
use arbor_plugins::{GraphProcessor, Plugin, PluginRegistry, ProcessorContext};
use tempfile::TempDir;

const LOCK: &str = r#"{
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "acme" },
    "node_modules/react": { "version": "18.2.0" },
    "node_modules/lodash": { "version": "4.17.21" }
  }
}"#;

/// Records which files it was asked to analyze and how many bins it saw.
struct RecordingExtractor {
    inner: SourceDependencyExtractor,
    files: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl RecordingExtractor {
    fn new(ctx: &BuildContext) -> Arc<Self> {
        Arc::new(RecordingExtractor {
            inner: SourceDependencyExtractor::new(&ctx.root, &ctx.config),
            files: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn seen(&self) -> Vec<String> {
        let mut files = self.files.lock().unwrap().clone();
        files.sort();
        files
    }
}

impl DependencyExtractor for RecordingExtractor {
    fn extract(&self, graph: &ProjectGraph, files: &ProjectFileMap) -> anyhow::Result<Vec<ExplicitDependency>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .extend(files.values().flatten().map(|f| f.file.clone()));
        self.inner.extract(graph, files)
    }
}

struct CrashingExtractor;

impl DependencyExtractor for CrashingExtractor {
    fn extract(&self, _graph: &ProjectGraph, _files: &ProjectFileMap) -> anyhow::Result<Vec<ExplicitDependency>> {
        panic!("extraction worker crashed")
    }
}

/// Minimal linear congruential generator so fixtures vary without a rand dependency.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

/// Workspace with `sizes.len()` libraries; `lib{i}` has `sizes[i]` files with random imports.
fn random_workspace(seed: u64, sizes: &[usize], extra_config: &str) -> TempDir {
    let mut rng = Lcg(seed);
    let mut config = String::from(extra_config);
    let mut files: Vec<(String, String)> = vec![("package-lock.json".into(), LOCK.into())];

    for (i, size) in sizes.iter().enumerate() {
        config.push_str(&format!("\n[projects.lib{i}]\nroot = \"libs/lib{i}\"\nkind = \"lib\"\n"));
        files.push((
            format!("libs/lib{i}/package.json"),
            format!(r#"{{ "name": "@acme/lib{i}" }}"#),
        ));
        for f in 0..*size {
            let mut body = String::new();
            for _ in 0..rng.next(4) {
                match rng.next(4) {
                    0 => body.push_str("import React from 'react';\n"),
                    1 => body.push_str("const _ = require('lodash');\n"),
                    _ => {
                        let target = rng.next(sizes.len());
                        body.push_str(&format!("import {{ x }} from '@acme/lib{target}';\n"));
                    }
                }
            }
            body.push_str(&format!("export const v{f} = {f};\n"));
            files.push((format!("libs/lib{i}/src/f{f:03}.ts"), body));
        }
    }
    files.push(("arbor.toml".into(), config));

    let structure: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    create_workspace(&structure)
}

fn cache_bytes(root: &Path) -> Vec<u8> {
    std::fs::read(root.join(".arbor/cache").join(GRAPH_CACHE)).unwrap()
}

/// Project-level edges as a sorted list, for order-insensitive comparison.
fn edge_set(graph: &ProjectGraph) -> Vec<(String, String, DependencyKind)> {
    let mut edges: Vec<_> = graph
        .all_dependencies()
        .map(|d| (d.source.clone(), d.target.clone(), d.kind))
        .collect();
    edges.sort();
    edges
}

#[tokio::test]
async fn test_idempotent_builds_write_identical_cache() {
    let temp = random_workspace(7, &[12, 30, 9], "");
    let ctx = BuildContext::load(temp.path()).unwrap();

    let first = build_project_graph(&ctx).await.unwrap();
    let first_bytes = cache_bytes(temp.path());
    let second = build_project_graph(&ctx).await.unwrap();

    assert_eq!(first.graph, second.graph);
    assert_eq!(cache_bytes(temp.path()), first_bytes);
    assert_eq!(second.stats.files_processed, 0);

    let leftovers: Vec<_> = std::fs::read_dir(temp.path().join(".arbor/cache"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(leftovers, vec![GRAPH_CACHE.to_string()]);
}

#[tokio::test]
async fn test_only_changed_file_is_reextracted() {
    let sources = generated_sources("libs/ui", 10, Some("react"));
    let mut structure: Vec<(&str, &str)> = sources.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    structure.push(("package-lock.json", LOCK));
    structure.push(("arbor.toml", "[projects.ui]\nroot = \"libs/ui\"\nkind = \"lib\"\n"));
    let temp = create_workspace(&structure);

    let ctx = BuildContext::load(temp.path()).unwrap();
    let recorder = RecordingExtractor::new(&ctx);
    let ctx = ctx.with_extractor(recorder.clone());
    build_project_graph(&ctx).await.unwrap();
    assert_eq!(recorder.seen().len(), 10);

    std::fs::write(
        temp.path().join("libs/ui/src/file004.ts"),
        "import _ from 'lodash';\nexport const v4 = 4;\n",
    )
    .unwrap();
    recorder.files.lock().unwrap().clear();

    let output = build_project_graph(&ctx).await.unwrap();

    assert_eq!(recorder.seen(), vec!["libs/ui/src/file004.ts"]);
    assert_eq!(output.stats.files_reused, 9);
    let ui = &output.graph.nodes["ui"];
    for file in &ui.files {
        let expected = if file.file.ends_with("file004.ts") { "npm:lodash" } else { "npm:react" };
        assert_eq!(file.deps.as_deref(), Some(&[expected.to_string()][..]), "{}", file.file);
    }
    assert!(output.graph.has_dependency("ui", "npm:react", DependencyKind::Static));
    assert!(output.graph.has_dependency("ui", "npm:lodash", DependencyKind::Static));
}

#[tokio::test]
async fn test_pooled_and_serial_builds_agree() {
    let fixtures: [(u64, &[usize]); 5] = [
        (1, &[10, 20, 9]),
        (2, &[33, 33, 33]),
        (3, &[50, 40, 30]),
        (4, &[5, 120, 37, 2]),
        (5, &[70, 0, 90]),
    ];

    for (seed, sizes) in fixtures {
        let temp = random_workspace(seed, sizes, "[cache]\nenabled = false\n");

        let mut serial_ctx = BuildContext::load(temp.path()).unwrap();
        serial_ctx.config.max_workers = Some(1);
        let serial = build_project_graph(&serial_ctx).await.unwrap();

        let mut pooled_ctx = BuildContext::load(temp.path()).unwrap();
        pooled_ctx.config.max_workers = Some(4);
        let pooled = build_project_graph(&pooled_ctx).await.unwrap();

        assert_eq!(edge_set(&pooled.graph), edge_set(&serial.graph), "seed {seed}");
        assert_eq!(pooled.graph, serial.graph, "seed {seed}");
    }
}

#[tokio::test]
async fn test_120_files_on_4_workers_use_18_bins() {
    // 50 + 40 + 30 sources; the package manifests are not counted
    let temp = random_workspace(11, &[50, 40, 30], "max_workers = 4\n[cache]\nenabled = false\n");
    let mut ctx = BuildContext::load(temp.path()).unwrap();
    let files = ctx.scanner.scan(&ctx.root, &ctx.config).unwrap();
    let sources: ProjectFileMap = files
        .into_iter()
        .map(|(name, files)| (name, files.into_iter().filter(|f| f.file.ends_with(".ts")).collect()))
        .collect();

    let recorder = RecordingExtractor::new(&ctx);
    ctx = ctx.with_extractor(recorder.clone());
    let pooled = arbor_pipeline::build_project_graph_using_file_map(&ctx, sources.clone(), None)
        .await
        .unwrap();
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 18);
    assert_eq!(recorder.seen().len(), 120);

    ctx.config.max_workers = Some(1);
    let serial = arbor_pipeline::build_project_graph_using_file_map(&ctx, sources, None)
        .await
        .unwrap();
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 19);
    assert_eq!(pooled.graph, serial.graph);
}

struct ExplodingPlugin;

#[async_trait::async_trait]
impl GraphProcessor for ExplodingPlugin {
    async fn process(&self, _graph: ProjectGraph, _context: &ProcessorContext<'_>) -> anyhow::Result<ProjectGraph> {
        anyhow::bail!("plugin misconfigured")
    }
}

#[tokio::test]
async fn test_throwing_plugin_does_not_change_graph() {
    let config = "plugins = [\"explodes\", \"e2e-app-link\"]\n\
                  [cache]\nenabled = false\n\
                  [projects.shop]\nroot = \"apps/shop\"\nkind = \"app\"\n\
                  [projects.shop-e2e]\nroot = \"apps/shop-e2e\"\nkind = \"e2e\"\n";
    let temp = create_workspace(&[
        ("arbor.toml", config),
        ("apps/shop/src/main.ts", "export {};\n"),
        ("apps/shop-e2e/src/smoke.ts", "export {};\n"),
    ]);

    let mut registry = PluginRegistry::with_builtins();
    registry.register("explodes", || Plugin::new("explodes", ExplodingPlugin));
    let ctx = BuildContext::load(temp.path()).unwrap().with_plugin_loader(registry);
    let with_failure = build_project_graph(&ctx).await.unwrap();

    let mut registry = PluginRegistry::with_builtins();
    registry.register("explodes", || Plugin::without_processor("explodes"));
    let ctx = BuildContext::load(temp.path()).unwrap().with_plugin_loader(registry);
    let baseline = build_project_graph(&ctx).await.unwrap();

    assert_eq!(with_failure.graph, baseline.graph);
    assert!(with_failure.graph.has_dependency("shop-e2e", "shop", DependencyKind::Implicit));
    assert!(with_failure.plugin_failures.is_empty());
}

#[tokio::test]
async fn test_worker_crash_aborts_and_keeps_previous_cache() {
    let temp = random_workspace(21, &[60, 60], "max_workers = 4\n");

    let ctx = BuildContext::load(temp.path()).unwrap();
    build_project_graph(&ctx).await.unwrap();
    let before = cache_bytes(temp.path());

    // a new core version invalidates the cache, so every file is queued for the pool
    let ctx = BuildContext::load(temp.path())
        .unwrap()
        .with_tool_version(CORE_PACKAGE, "999.0.0")
        .with_extractor(Arc::new(CrashingExtractor));
    let err = build_project_graph(&ctx).await.unwrap_err();

    assert!(format!("{err:#}").contains("extraction worker crashed"));
    assert_eq!(cache_bytes(temp.path()), before);
}

#[tokio::test]
async fn test_lock_file_supplies_external_nodes() {
    let temp = random_workspace(3, &[4], "");
    let ctx = BuildContext::load(temp.path()).unwrap();

    let output = build_project_graph(&ctx).await.unwrap();

    assert_eq!(
        output.graph.external_nodes.keys().collect::<Vec<_>>(),
        vec!["npm:lodash", "npm:react"]
    );
    assert_eq!(output.graph.external_nodes["npm:react"].version, "18.2.0");
}
