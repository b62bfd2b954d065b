//! Graph processor capability exposed by plugins

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use arbor_core::{ProjectFileMap, ProjectGraph, WorkspaceConfig};

/// What a processor can see besides the graph itself.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorContext<'a> {
    pub workspace: &'a WorkspaceConfig,
    /// Every workspace file, per project.
    pub file_map: &'a ProjectFileMap,
    /// Files whose dependencies are recomputed in this build.
    pub files_to_process: &'a ProjectFileMap,
}

/// Graph post-processing hook.
///
/// Receives the cumulative graph produced by earlier plugins and returns the
/// graph handed to the next one.
#[async_trait::async_trait]
pub trait GraphProcessor: Send + Sync {
    async fn process(&self, graph: ProjectGraph, context: &ProcessorContext<'_>) -> Result<ProjectGraph>;
}

/// A loaded plugin. Plugins without a processor take no part in graph construction.
#[derive(Clone)]
pub struct Plugin {
    pub name: String,
    pub processor: Option<Arc<dyn GraphProcessor>>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, processor: impl GraphProcessor + 'static) -> Self {
        Plugin {
            name: name.into(),
            processor: Some(Arc::new(processor)),
        }
    }

    /// A plugin that contributes nothing to the project graph.
    pub fn without_processor(name: impl Into<String>) -> Self {
        Plugin {
            name: name.into(),
            processor: None,
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("has_processor", &self.processor.is_some())
            .finish()
    }
}
