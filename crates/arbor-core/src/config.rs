//! Workspace configuration loading from `arbor.toml`.
//!
//! ```toml
//! plugins = ["e2e-app-link"]
//! max_workers = 4
//!
//! [projects.web]
//! root = "apps/web"
//! kind = "app"
//! tags = ["scope:web"]
//! implicit_dependencies = ["shared-assets"]
//!
//! [path_mappings]
//! "@acme/ui" = ["libs/ui/src/index.ts"]
//!
//! [plugins_config."@arbor/js"]
//! analyze_source_files = true
//!
//! [package_versions]
//! "e2e-app-link" = "1.0.0"
//!
//! [cache]
//! enabled = true
//! directory = ".arbor/cache"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::ProjectKind;

/// Configuration file name at the workspace root.
pub const CONFIG_FILE: &str = "arbor.toml";

/// Default cache directory, relative to the workspace root.
pub const DEFAULT_CACHE_DIR: &str = ".arbor/cache";

pub const ENV_CACHE_PROJECT_GRAPH: &str = "ARBOR_CACHE_PROJECT_GRAPH";
pub const ENV_MAX_WORKERS: &str = "ARBOR_PROJECT_GRAPH_MAX_WORKERS";
pub const ENV_VERBOSE_LOGGING: &str = "ARBOR_VERBOSE_LOGGING";

/// Root configuration structure loaded from `arbor.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,

    /// Ordered plugin names.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Free-form per-plugin configuration, keyed by plugin name.
    #[serde(default)]
    pub plugins_config: Option<serde_json::Value>,

    /// Import alias -> target paths. A trailing `*` matches any suffix.
    #[serde(default)]
    pub path_mappings: BTreeMap<String, Vec<String>>,

    /// Declared versions of tool and plugin packages.
    #[serde(default)]
    pub package_versions: BTreeMap<String, String>,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Upper bound on extraction workers.
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Surface plugin failures to the caller.
    #[serde(default)]
    pub verbose: bool,
}

/// One workspace project.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectConfig {
    pub root: String,
    pub kind: ProjectKind,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Project names, `"*"` for every project, `"!name"` to exclude one.
    #[serde(default)]
    pub implicit_dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            directory: default_cache_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

impl WorkspaceConfig {
    /// Parse and validate a configuration document.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: WorkspaceConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ARBOR_*` overrides. `lookup` is usually `std::env::var(..).ok()`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_CACHE_PROJECT_GRAPH) {
            self.cache.enabled = value != "false";
        }
        if let Some(value) = lookup(ENV_MAX_WORKERS) {
            match value.parse::<usize>() {
                Ok(n) => self.max_workers = Some(n),
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_MAX_WORKERS, value),
            }
        }
        if let Some(value) = lookup(ENV_VERBOSE_LOGGING) {
            self.verbose = value == "true";
        }
    }

    /// Plugin configuration for one plugin, if any.
    pub fn plugin_config(&self, name: &str) -> Option<&serde_json::Value> {
        self.plugins_config.as_ref().and_then(|c| c.get(name))
    }

    /// Absolute cache directory for a workspace rooted at `root`.
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.cache.directory)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, project) in &self.projects {
            if project.root.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("project '{name}' has an empty root")));
            }
            for dep in &project.implicit_dependencies {
                let target = dep.strip_prefix('!').unwrap_or(dep);
                if target != "*" && !self.projects.contains_key(target) {
                    return Err(ConfigError::Invalid(format!(
                        "project '{name}' has an implicit dependency on unknown project '{target}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Supplies per-project configuration for a workspace.
pub trait ProjectConfigLoader: Send + Sync {
    fn load(&self, workspace_root: &Path) -> Result<WorkspaceConfig, ConfigError>;
}

/// Reads `arbor.toml` from the workspace root.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlProjectConfigLoader;

impl ProjectConfigLoader for TomlProjectConfigLoader {
    fn load(&self, workspace_root: &Path) -> Result<WorkspaceConfig, ConfigError> {
        let path = workspace_root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        WorkspaceConfig::from_toml_str(&content, &path)
    }
}
