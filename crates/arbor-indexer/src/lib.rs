//! Workspace scanning, lock file parsing and dependency extraction

pub mod coordinator;
pub mod extractor;
pub mod languages;
pub mod lockfile;
pub mod resolver;
pub mod scanner;
pub mod worker_pool;


pub use coordinator::{ExecutionPlan, ExtractionCoordinator, ExtractionError};
pub use extractor::{
    DependencyExtractor, ExplicitDependency, JS_PLUGIN_CONFIG_KEY, JsAnalysisOptions, SourceDependencyExtractor,
};
pub use lockfile::{LockFileError, LockFileGraph, LockFileParser, NPM_LOCK_FILE, NpmLockFileParser};
pub use scanner::{FsWorkspaceScanner, WorkspaceScanner, hash_content};
pub use worker_pool::WorkerPool;
