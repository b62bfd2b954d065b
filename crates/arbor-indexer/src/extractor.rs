//! Dependency extractor trait and the default source/manifest extractor

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use arbor_core::{ProjectFileMap, ProjectGraph, WorkspaceConfig};
use serde::Deserialize;

use crate::languages::{SourceKind, javascript, package_json};
use crate::resolver::TargetResolver;

/// Plugin configuration key read by [`SourceDependencyExtractor`].
pub const JS_PLUGIN_CONFIG_KEY: &str = "@arbor/js";

/// `source_project_file` in `source_project_name` depends on `target_project_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExplicitDependency {
    pub source_project_name: String,
    pub source_project_file: String,
    pub target_project_name: String,
}

/// Computes file-level dependencies.
///
/// Implementations must be pure with respect to their inputs: the same graph
/// and files always yield the same triples, in project order then file
/// order. Extraction may run on several worker threads at once, each with its
/// own copy of the graph.
pub trait DependencyExtractor: Send + Sync {
    fn extract(&self, graph: &ProjectGraph, files: &ProjectFileMap) -> anyhow::Result<Vec<ExplicitDependency>>;
}

/// What the source extractor analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JsAnalysisOptions {
    #[serde(default = "default_true")]
    pub analyze_source_files: bool,
    #[serde(default = "default_true")]
    pub analyze_package_json: bool,
}

impl Default for JsAnalysisOptions {
    fn default() -> Self {
        JsAnalysisOptions {
            analyze_source_files: true,
            analyze_package_json: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Reads queued files from disk and resolves their imports.
#[derive(Debug, Clone)]
pub struct SourceDependencyExtractor {
    workspace_root: PathBuf,
    options: JsAnalysisOptions,
    path_mappings: BTreeMap<String, Vec<String>>,
    /// package.json `name` -> project name
    package_names: HashMap<String, String>,
}

impl SourceDependencyExtractor {
    pub fn new(workspace_root: impl Into<PathBuf>, config: &WorkspaceConfig) -> Self {
        let workspace_root = workspace_root.into();

        let options = match config.plugin_config(JS_PLUGIN_CONFIG_KEY) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                tracing::warn!("Invalid {} configuration, using defaults: {}", JS_PLUGIN_CONFIG_KEY, e);
                JsAnalysisOptions::default()
            }),
            None => JsAnalysisOptions::default(),
        };

        let package_names = config
            .projects
            .iter()
            .filter_map(|(name, project)| {
                let manifest = workspace_root.join(&project.root).join("package.json");
                let content = std::fs::read_to_string(manifest).ok()?;
                package_json::package_name(&content).map(|pkg| (pkg, name.clone()))
            })
            .collect();

        SourceDependencyExtractor {
            workspace_root,
            options,
            path_mappings: config.path_mappings.clone(),
            package_names,
        }
    }

    pub fn options(&self) -> JsAnalysisOptions {
        self.options
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn specifiers(&self, kind: SourceKind, file: &str) -> Option<Vec<String>> {
        let path = self.workspace_root.join(file);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                return None;
            }
        };

        match kind {
            SourceKind::Script => Some(javascript::scan_imports(&content)),
            SourceKind::PackageManifest => match package_json::dependency_names(&content) {
                Ok(names) => Some(names),
                Err(e) => {
                    tracing::warn!("Cannot parse {}: {}", path.display(), e);
                    None
                }
            },
        }
    }
}

impl DependencyExtractor for SourceDependencyExtractor {
    fn extract(&self, graph: &ProjectGraph, files: &ProjectFileMap) -> anyhow::Result<Vec<ExplicitDependency>> {
        let resolver = TargetResolver::new(graph, &self.path_mappings, &self.package_names);
        let mut found = Vec::new();

        for (project, project_files) in files {
            for file in project_files {
                let Some(kind) = SourceKind::from_path(&file.file) else {
                    continue;
                };
                let enabled = match kind {
                    SourceKind::Script => self.options.analyze_source_files,
                    SourceKind::PackageManifest => self.options.analyze_package_json,
                };
                if !enabled {
                    continue;
                }
                let Some(specifiers) = self.specifiers(kind, &file.file) else {
                    continue;
                };

                let mut seen = HashSet::new();
                for specifier in specifiers {
                    let target = match kind {
                        SourceKind::Script => resolver.resolve(&file.file, &specifier),
                        SourceKind::PackageManifest => resolver.resolve_package(&specifier),
                    };
                    let Some(target) = target else {
                        continue;
                    };
                    if &target == project || !seen.insert(target.clone()) {
                        continue;
                    }
                    found.push(ExplicitDependency {
                        source_project_name: project.clone(),
                        source_project_file: file.file.clone(),
                        target_project_name: target,
                    });
                }
            }
        }

        Ok(found)
    }
}
