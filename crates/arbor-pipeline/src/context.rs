//! Everything one graph build needs, constructed once and passed explicitly

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arbor_core::{CacheStore, ProjectConfigLoader, TomlProjectConfigLoader, WorkspaceConfig};
use arbor_indexer::{
    DependencyExtractor, FsWorkspaceScanner, LockFileParser, NpmLockFileParser, SourceDependencyExtractor,
    WorkspaceScanner,
};
use arbor_plugins::{PluginLoader, PluginRegistry};

pub struct BuildContext {
    pub root: PathBuf,
    pub config: WorkspaceConfig,
    pub cache: CacheStore,
    /// Versions of the running tool's packages, folded into the fingerprint.
    pub tool_versions: BTreeMap<String, String>,
    pub scanner: Arc<dyn WorkspaceScanner>,
    pub lock_parser: Arc<dyn LockFileParser>,
    pub plugin_loader: Arc<dyn PluginLoader>,
    pub extractor: Arc<dyn DependencyExtractor>,
}

impl BuildContext {
    /// Load `arbor.toml` under `root` and apply `ARBOR_*` environment overrides.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with(root, &TomlProjectConfigLoader)
    }

    pub fn load_with(root: impl Into<PathBuf>, loader: &dyn ProjectConfigLoader) -> Result<Self> {
        let root = root.into();
        let mut config = loader
            .load(&root)
            .with_context(|| format!("Failed to load workspace configuration in {}", root.display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(Self::from_config(root, config))
    }

    /// Default collaborators for a workspace on disk.
    pub fn from_config(root: impl Into<PathBuf>, config: WorkspaceConfig) -> Self {
        let root = root.into();
        let extractor = SourceDependencyExtractor::new(&root, &config);

        BuildContext {
            cache: CacheStore::new(config.cache_dir(&root)),
            root,
            config,
            tool_versions: BTreeMap::new(),
            scanner: Arc::new(FsWorkspaceScanner::new()),
            lock_parser: Arc::new(NpmLockFileParser::new()),
            plugin_loader: Arc::new(PluginRegistry::with_builtins()),
            extractor: Arc::new(extractor),
        }
    }

    pub fn with_tool_version(mut self, package: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(package.into(), version.into());
        self
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_scanner(mut self, scanner: impl WorkspaceScanner + 'static) -> Self {
        self.scanner = Arc::new(scanner);
        self
    }

    pub fn with_lock_parser(mut self, parser: impl LockFileParser + 'static) -> Self {
        self.lock_parser = Arc::new(parser);
        self
    }

    pub fn with_plugin_loader(mut self, loader: impl PluginLoader + 'static) -> Self {
        self.plugin_loader = Arc::new(loader);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DependencyExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_enabled(&self) -> bool {
        self.config.cache.enabled
    }

    pub fn verbose(&self) -> bool {
        self.config.verbose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::test_utils::create_workspace;

    #[test]
    fn test_load_from_workspace() {
        let temp = create_workspace(&[(
            "arbor.toml",
            r#"
plugins = ["e2e-app-link"]

[projects.web]
root = "apps/web"
kind = "app"

[cache]
directory = "tmp/graph-cache"
"#,
        )]);

        let ctx = BuildContext::load(temp.path()).unwrap();
        assert_eq!(ctx.config.plugins, vec!["e2e-app-link"]);
        assert_eq!(ctx.cache.dir(), temp.path().join("tmp/graph-cache"));
        assert!(ctx.tool_versions.is_empty());
    }

    #[test]
    fn test_invalid_configuration_is_fatal() {
        let temp = create_workspace(&[("arbor.toml", "[projects.web]\nroot = 3\n")]);
        let err = BuildContext::load(temp.path()).err().unwrap();
        assert!(format!("{err:#}").contains("Failed to load workspace configuration"));

        let empty = tempfile::tempdir().unwrap();
        assert!(BuildContext::load(empty.path()).is_err());
    }
}
