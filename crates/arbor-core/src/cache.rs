//! On-disk project graph cache.
//!
//! The cache is a single JSON document at `<cache dir>/project-graph.json`
//! holding the last frozen graph together with the fingerprint it was built
//! under. A snapshot whose fingerprint no longer matches is discarded as a
//! whole; otherwise per-file deps are reused for files whose hash is unchanged.
//! Writes go to a uniquely named temp file which is then renamed over the
//! cache file, so readers only ever see a complete document.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ProjectConfig, WorkspaceConfig};
use crate::model::*;

/// Graph cache file name inside the cache directory.
pub const GRAPH_CACHE: &str = "project-graph.json";

/// Bumped whenever the snapshot layout or extraction semantics change.
pub const SCHEMA_VERSION: &str = "1.0";

/// Package name under which the graph library records its own version.
pub const CORE_PACKAGE: &str = "arbor-core";

/// Package name under which the CLI records its version.
pub const CLI_PACKAGE: &str = "arbor";

/// Lock hash recorded when the workspace has no lock manifest.
pub const NO_LOCK_FILE_HASH: &str = "n/a";

const MAX_WRITE_ATTEMPTS: u32 = 5;

/// A plugin as it was configured when the snapshot was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFingerprint {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// The tracked inputs whose equality decides between cache reuse and a full recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub tool_dependency_versions: BTreeMap<String, String>,
    pub lock_file_hash: String,
    pub path_mappings: BTreeMap<String, Vec<String>>,
    pub plugins: Vec<PluginFingerprint>,
    pub plugins_config: Option<serde_json::Value>,
}

impl Fingerprint {
    /// Build the fingerprint for the current workspace state.
    ///
    /// The library's own version is recorded first, then `tool_versions` are
    /// merged over it and the configured package versions.
    pub fn new(
        config: &WorkspaceConfig,
        tool_versions: &BTreeMap<String, String>,
        lock_file_hash: impl Into<String>,
    ) -> Self {
        let mut versions = config.package_versions.clone();
        versions.insert(CORE_PACKAGE.to_string(), env!("CARGO_PKG_VERSION").to_string());
        versions.extend(tool_versions.iter().map(|(k, v)| (k.clone(), v.clone())));

        let plugins = config
            .plugins
            .iter()
            .map(|name| PluginFingerprint {
                name: name.clone(),
                version: versions.get(name).cloned(),
            })
            .collect();

        Fingerprint {
            tool_dependency_versions: versions,
            lock_file_hash: lock_file_hash.into(),
            path_mappings: config.path_mappings.clone(),
            plugins,
            plugins_config: config.plugins_config.clone(),
        }
    }
}

/// Persisted graph plus the fingerprint it was computed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub schema_version: String,
    pub tool_dependency_versions: BTreeMap<String, String>,
    pub lock_file_hash: String,
    pub path_mappings: BTreeMap<String, Vec<String>>,
    pub plugin_fingerprints: Vec<PluginFingerprint>,
    #[serde(default)]
    pub plugins_config: Option<serde_json::Value>,
    pub nodes: BTreeMap<String, ProjectNode>,
    #[serde(default)]
    pub external_nodes: BTreeMap<String, ExternalNode>,
    pub dependencies: BTreeMap<String, Vec<Dependency>>,
}

/// Outcome of comparing current files against a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDiff {
    /// Files that must be analyzed again.
    pub files_to_process: ProjectFileMap,
    /// Unchanged files with their cached deps, per project then per file.
    pub cached_file_data: BTreeMap<String, BTreeMap<String, FileData>>,
}

impl FileDiff {
    /// Everything must be analyzed; nothing is reused.
    pub fn full(file_map: &ProjectFileMap) -> Self {
        FileDiff {
            files_to_process: file_map.clone(),
            cached_file_data: BTreeMap::new(),
        }
    }

    pub fn files_to_process_count(&self) -> usize {
        self.files_to_process.values().map(Vec::len).sum()
    }
}

impl CacheSnapshot {
    pub fn new(graph: &ProjectGraph, fingerprint: &Fingerprint) -> Self {
        CacheSnapshot {
            schema_version: SCHEMA_VERSION.to_string(),
            tool_dependency_versions: fingerprint.tool_dependency_versions.clone(),
            lock_file_hash: fingerprint.lock_file_hash.clone(),
            path_mappings: fingerprint.path_mappings.clone(),
            plugin_fingerprints: fingerprint.plugins.clone(),
            plugins_config: fingerprint.plugins_config.clone(),
            nodes: graph.nodes.clone(),
            external_nodes: graph.external_nodes.clone(),
            dependencies: graph.dependencies.clone(),
        }
    }

    /// True if cached deps can no longer be trusted and the whole graph must be recomputed.
    pub fn is_stale(
        &self,
        current: &Fingerprint,
        projects: &BTreeMap<String, ProjectConfig>,
    ) -> bool {
        if self.schema_version != SCHEMA_VERSION {
            tracing::debug!("Cache schema {} != {}", self.schema_version, SCHEMA_VERSION);
            return true;
        }

        for package in [CORE_PACKAGE, CLI_PACKAGE] {
            if self.tool_dependency_versions.get(package)
                != current.tool_dependency_versions.get(package)
            {
                tracing::debug!("Tool package '{}' version changed", package);
                return true;
            }
        }

        if let Some(removed) = self.nodes.keys().find(|name| !projects.contains_key(*name)) {
            tracing::debug!("Cached project '{}' no longer exists", removed);
            return true;
        }

        if let Some(alias) = self
            .path_mappings
            .iter()
            .find(|(alias, targets)| current.path_mappings.get(*alias) != Some(*targets))
            .map(|(alias, _)| alias)
        {
            tracing::debug!("Path mapping '{}' changed", alias);
            return true;
        }

        if self.plugin_fingerprints.len() != current.plugins.len() {
            tracing::debug!("Plugin list changed");
            return true;
        }
        let cached_plugins: BTreeSet<(&str, Option<&str>)> = self
            .plugin_fingerprints
            .iter()
            .map(|p| (p.name.as_str(), p.version.as_deref()))
            .collect();
        if current
            .plugins
            .iter()
            .any(|p| !cached_plugins.contains(&(p.name.as_str(), p.version.as_deref())))
        {
            tracing::debug!("Plugin name or version changed");
            return true;
        }

        if self.plugins_config != current.plugins_config {
            tracing::debug!("Plugin configuration changed");
            return true;
        }

        false
    }

    /// Split current files into those needing analysis and those whose deps can be reused.
    pub fn diff(&self, file_map: &ProjectFileMap) -> FileDiff {
        let mut result = FileDiff::default();

        for (project, files) in file_map.iter().filter(|(_, files)| !files.is_empty()) {
            let Some(cached) = self.nodes.get(project) else {
                result.files_to_process.insert(project.clone(), files.clone());
                continue;
            };

            let by_path: BTreeMap<&str, &FileData> =
                cached.files.iter().map(|f| (f.file.as_str(), f)).collect();
            let reused = result.cached_file_data.entry(project.clone()).or_default();

            for file in files {
                match by_path.get(file.file.as_str()) {
                    Some(hit) if hit.hash == file.hash => {
                        reused.insert(file.file.clone(), (*hit).clone());
                    }
                    _ => result
                        .files_to_process
                        .entry(project.clone())
                        .or_default()
                        .push(file.clone()),
                }
            }
        }

        result
    }

    /// External nodes and the edges leaving them, as a seed graph.
    pub fn external_partial_graph(&self) -> ProjectGraph {
        let dependencies = self
            .dependencies
            .iter()
            .filter(|(source, _)| self.external_nodes.contains_key(*source))
            .map(|(source, deps)| (source.clone(), deps.clone()))
            .collect();

        ProjectGraph {
            version: None,
            nodes: BTreeMap::new(),
            external_nodes: self.external_nodes.clone(),
            dependencies,
        }
    }
}

/// Filesystem primitives used when persisting the cache.
pub trait CacheIo: Send + Sync {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Plain `std::fs` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCacheIo;

impl CacheIo for FsCacheIo {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }
}

/// Loads and persists [`CacheSnapshot`]s for one cache directory.
pub struct CacheStore {
    dir: PathBuf,
    io: Box<dyn CacheIo>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("dir", &self.dir).finish()
    }
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CacheStore {
            dir: dir.into(),
            io: Box::new(FsCacheIo),
        }
    }

    /// Replace the filesystem primitives (used to simulate write failures).
    pub fn with_io(mut self, io: impl CacheIo + 'static) -> Self {
        self.io = Box::new(io);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache document.
    pub fn path(&self) -> PathBuf {
        self.dir.join(GRAPH_CACHE)
    }

    /// Read the last snapshot. Missing or unreadable caches yield `None`.
    pub fn load(&self) -> Option<CacheSnapshot> {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No project graph cache at {}", path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Error reading '{}', continuing without the cache: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => {
                tracing::debug!("Project graph cache loaded from: {}", path.display());
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!("Error parsing '{}', continuing without the cache: {}", path.display(), e);
                None
            }
        }
    }

    /// Snapshot `graph` under `fingerprint` and write it. Returns whether it was written.
    pub fn persist(&self, graph: &ProjectGraph, fingerprint: &Fingerprint) -> bool {
        self.write_snapshot(&CacheSnapshot::new(graph, fingerprint))
    }

    /// Atomically replace the cache document, retrying on I/O failure.
    ///
    /// Failure is logged and swallowed; the previous cache is left in place.
    pub fn write_snapshot(&self, snapshot: &CacheSnapshot) -> bool {
        let contents = match serde_json::to_vec_pretty(snapshot) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to serialize project graph cache: {}", e);
                return false;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!("Failed to create cache directory {}: {}", self.dir.display(), e);
            return false;
        }

        let target = self.path();
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let temp = self.temp_path();
            match self.write_once(&temp, &target, &contents) {
                Ok(()) => {
                    tracing::debug!("Project graph cache written: {}", target.display());
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        "Error ({}/{}) writing {}: {}",
                        attempt,
                        MAX_WRITE_ATTEMPTS,
                        target.display(),
                        e
                    );
                    let _ = std::fs::remove_file(&temp);
                }
            }
        }

        tracing::warn!("Giving up on writing the project graph cache; next run recomputes");
        false
    }

    /// Remove the cache directory.
    pub fn clear(&self) -> io::Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    fn write_once(&self, temp: &Path, target: &Path, contents: &[u8]) -> io::Result<()> {
        self.io.write(temp, contents)?;
        self.io.rename(temp, target)
    }

    fn temp_path(&self) -> PathBuf {
        let unique = uuid::Uuid::new_v4().simple().to_string();
        self.dir.join(format!("{}~{}", GRAPH_CACHE, &unique[..8]))
    }
}
