//! Ordered, failure-isolating plugin execution

use std::panic::AssertUnwindSafe;

use arbor_core::ProjectGraph;
use futures_util::FutureExt;

use crate::plugin::{Plugin, ProcessorContext};

/// A plugin that failed while processing the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFailure {
    pub plugin: String,
    pub message: String,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub graph: ProjectGraph,
    /// Only populated in verbose mode.
    pub failures: Vec<PluginFailure>,
}

/// Runs plugins in order, each on the output of the previous one.
///
/// A plugin that returns an error or panics is skipped: the graph as it was
/// before that plugin goes to the next one.
#[derive(Debug, Clone, Default)]
pub struct PluginPipeline {
    plugins: Vec<Plugin>,
    verbose: bool,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        PluginPipeline {
            plugins,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub async fn run(&self, graph: ProjectGraph, context: &ProcessorContext<'_>) -> PipelineOutput {
        let mut graph = graph;
        let mut failures = Vec::new();

        for plugin in &self.plugins {
            let Some(processor) = &plugin.processor else {
                continue;
            };

            let outcome = AssertUnwindSafe(processor.process(graph.clone(), context))
                .catch_unwind()
                .await;

            let message = match outcome {
                Ok(Ok(updated)) => {
                    graph = updated;
                    continue;
                }
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => panic_message(payload.as_ref()),
            };

            if self.verbose {
                tracing::error!("Failed to process the project graph with \"{}\": {}", plugin.name, message);
                failures.push(PluginFailure {
                    plugin: plugin.name.clone(),
                    message,
                });
            } else {
                tracing::warn!("Failed to process the project graph with \"{}\"", plugin.name);
                tracing::warn!("Run with ARBOR_VERBOSE_LOGGING=true to see the error.");
            }
        }

        PipelineOutput { graph, failures }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
