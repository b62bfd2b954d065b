//! Arbor Core: project graph model, builder, and on-disk cache

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;


#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use builder::ProjectGraphBuilder;
pub use cache::{
    CLI_PACKAGE, CORE_PACKAGE, CacheIo, CacheSnapshot, CacheStore, FileDiff, Fingerprint, FsCacheIo,
    GRAPH_CACHE, NO_LOCK_FILE_HASH, PluginFingerprint, SCHEMA_VERSION,
};
pub use config::{
    CONFIG_FILE, CacheConfig, ProjectConfig, ProjectConfigLoader, TomlProjectConfigLoader, WorkspaceConfig,
};
pub use error::{ConfigError, GraphError};
pub use graph::DependencyView;
pub use model::{
    Dependency, DependencyKind, ExternalNode, FileData, ProjectFileMap, ProjectGraph, ProjectKind, ProjectNode,
};
