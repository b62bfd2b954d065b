//! Mutable accumulator for a project graph under construction

use crate::error::GraphError;
use crate::model::*;

/// Owns the in-progress graph. Snapshots handed out are independent copies.
#[derive(Debug, Default)]
pub struct ProjectGraphBuilder {
    graph: ProjectGraph,
}

impl ProjectGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue building on top of an existing graph.
    pub fn from_graph(graph: ProjectGraph) -> Self {
        ProjectGraphBuilder { graph }
    }

    /// Read access to the graph as it currently stands.
    pub fn graph(&self) -> &ProjectGraph {
        &self.graph
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.graph.version = Some(version.into());
    }

    /// Add or replace a workspace project node.
    pub fn add_node(&mut self, node: ProjectNode) {
        self.graph.nodes.insert(node.name.clone(), node);
    }

    /// Add or replace an external package node.
    pub fn add_external_node(&mut self, node: ExternalNode) {
        self.graph.external_nodes.insert(node.name.clone(), node);
    }

    /// Fold a partial graph (usually external packages from a lock file) into this one.
    pub fn merge(&mut self, partial: ProjectGraph) {
        for (_, node) in partial.nodes {
            self.add_node(node);
        }
        for (_, node) in partial.external_nodes {
            self.add_external_node(node);
        }
        for dep in partial.dependencies.into_values().flatten() {
            self.insert_dependency(dep);
        }
    }

    /// Record that `source_file` of `source` imports `target`.
    ///
    /// The target is appended to the file's `deps` and a `static` edge is added
    /// at project level. Self references are ignored.
    pub fn add_explicit_dependency(
        &mut self,
        source: &str,
        source_file: &str,
        target: &str,
    ) -> Result<(), GraphError> {
        if !self.graph.contains(source) {
            return Err(GraphError::UnknownSourceProject(source.to_string()));
        }
        if !self.graph.contains(target) {
            return Err(GraphError::UnknownTargetProject(target.to_string()));
        }
        if source == target {
            return Ok(());
        }

        let node = self
            .graph
            .nodes
            .get_mut(source)
            .ok_or_else(|| GraphError::UnknownSourceProject(source.to_string()))?;
        let file = node
            .files
            .iter_mut()
            .find(|f| f.file == source_file)
            .ok_or_else(|| GraphError::FileNotInProject {
                project: source.to_string(),
                file: source_file.to_string(),
            })?;

        let deps = file.deps.get_or_insert_with(Vec::new);
        if !deps.iter().any(|d| d == target) {
            deps.push(target.to_string());
        }

        self.insert_dependency(Dependency::new(source, target, DependencyKind::Static));
        Ok(())
    }

    /// Add a configuration-declared edge.
    pub fn add_implicit_dependency(&mut self, source: &str, target: &str) -> Result<(), GraphError> {
        self.add_project_dependency(source, target, DependencyKind::Implicit)
    }

    /// Add a project-level edge of any kind without touching per-file data.
    pub fn add_project_dependency(
        &mut self,
        source: &str,
        target: &str,
        kind: DependencyKind,
    ) -> Result<(), GraphError> {
        if !self.graph.contains(source) {
            return Err(GraphError::UnknownSourceProject(source.to_string()));
        }
        if !self.graph.contains(target) {
            return Err(GraphError::UnknownTargetProject(target.to_string()));
        }
        if source == target {
            return Ok(());
        }
        self.insert_dependency(Dependency::new(source, target, kind));
        Ok(())
    }

    /// Restore cached per-file deps for a file that did not change.
    ///
    /// Targets that no longer exist in the graph are dropped. Returns the
    /// number of deps restored.
    pub fn restore_file_dependencies(&mut self, project: &str, file: &str, deps: &[String]) -> usize {
        let known: Vec<String> = deps
            .iter()
            .filter(|d| self.graph.contains(d) && d.as_str() != project)
            .cloned()
            .collect();

        let Some(node) = self.graph.nodes.get_mut(project) else {
            return 0;
        };
        let Some(entry) = node.files.iter_mut().find(|f| f.file == file) else {
            return 0;
        };
        entry.deps = Some(known.clone());

        for target in &known {
            self.insert_dependency(Dependency::new(project, target.as_str(), DependencyKind::Static));
        }
        known.len()
    }

    /// A copy of the current graph; later mutation does not affect it.
    pub fn get_updated_project_graph(&self) -> ProjectGraph {
        self.graph.clone()
    }

    /// Freeze the builder into its final graph.
    pub fn build(self) -> ProjectGraph {
        self.graph
    }

    fn insert_dependency(&mut self, dep: Dependency) {
        let edges = self.graph.dependencies.entry(dep.source.clone()).or_default();
        if !edges.contains(&dep) {
            edges.push(dep);
        }
    }
}
