//! Graph-processing plugins for arbor
//!
//! Plugins are loaded by name from a [`PluginRegistry`] and run in order by
//! the [`PluginPipeline`] over the node-only project graph.

pub mod builtin;
pub mod pipeline;
pub mod plugin;
pub mod registry;


pub use builtin::{E2E_APP_LINK, E2eAppLinkProcessor};
pub use pipeline::{PipelineOutput, PluginFailure, PluginPipeline};
pub use plugin::{GraphProcessor, Plugin, ProcessorContext};
pub use registry::{PluginError, PluginLoader, PluginRegistry};
