//! Read-only traversal view over a frozen project graph, backed by petgraph::StableDiGraph

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Dfs, EdgeRef};

use crate::model::{DependencyKind, ProjectGraph};

/// Whether a view node is a workspace project or an external package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewNodeKind {
    Project,
    External,
}

#[derive(Debug, Clone)]
pub struct ViewNode {
    pub name: String,
    pub kind: ViewNodeKind,
}

/// Directed multigraph of project and external nodes.
pub struct DependencyView {
    inner: StableDiGraph<ViewNode, DependencyKind>,
    index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for DependencyView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyView")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyView {
    pub fn new(graph: &ProjectGraph) -> Self {
        let mut inner = StableDiGraph::new();
        let mut index = HashMap::new();

        for name in graph.nodes.keys() {
            let idx = inner.add_node(ViewNode {
                name: name.clone(),
                kind: ViewNodeKind::Project,
            });
            index.insert(name.clone(), idx);
        }
        for name in graph.external_nodes.keys() {
            let idx = inner.add_node(ViewNode {
                name: name.clone(),
                kind: ViewNodeKind::External,
            });
            index.insert(name.clone(), idx);
        }

        for dep in graph.all_dependencies() {
            // edges to nodes that never made it into the graph are skipped
            if let (Some(&s), Some(&t)) = (index.get(&dep.source), index.get(&dep.target)) {
                inner.add_edge(s, t, dep.kind);
            }
        }

        DependencyView { inner, index }
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Everything reachable from `name`, excluding `name` itself.
    pub fn transitive_dependencies(&self, name: &str) -> BTreeSet<String> {
        let Some(&start) = self.index.get(name) else {
            return BTreeSet::new();
        };

        let mut reachable = BTreeSet::new();
        let mut dfs = Dfs::new(&self.inner, start);
        while let Some(idx) = dfs.next(&self.inner) {
            if idx != start {
                reachable.insert(self.inner[idx].name.clone());
            }
        }
        reachable
    }

    /// Direct dependents of `name`.
    pub fn dependents(&self, name: &str) -> BTreeSet<String> {
        let Some(&idx) = self.index.get(name) else {
            return BTreeSet::new();
        };
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.inner[e.source()].name.clone())
            .collect()
    }

    /// True if workspace projects depend on each other in a cycle.
    pub fn has_project_cycle(&self) -> bool {
        // external nodes never point back at projects, so any cycle through a
        // project is made of projects only
        petgraph::algo::tarjan_scc(&self.inner).iter().any(|component| {
            component.len() > 1
                && component
                    .iter()
                    .all(|&idx| self.inner[idx].kind == ViewNodeKind::Project)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProjectGraphBuilder;
    use crate::model::ProjectKind;
    use crate::test_utils::{project, sample_graph};

    #[test]
    fn transitive_dependencies_cross_into_external_nodes() {
        let view = DependencyView::new(&sample_graph());

        assert_eq!(view.node_count(), 4);
        assert_eq!(view.edge_count(), 3);
        let deps = view.transitive_dependencies("app");
        assert_eq!(
            deps.into_iter().collect::<Vec<_>>(),
            vec!["npm:react", "npm:scheduler", "ui"]
        );
        assert_eq!(
            view.dependents("ui").into_iter().collect::<Vec<_>>(),
            vec!["app"]
        );
    }

    #[test]
    fn detects_cycles_between_projects() {
        assert!(!DependencyView::new(&sample_graph()).has_project_cycle());

        let mut builder = ProjectGraphBuilder::new();
        builder.add_node(project("a", ProjectKind::Lib, "libs/a", &[]));
        builder.add_node(project("b", ProjectKind::Lib, "libs/b", &[]));
        builder.add_implicit_dependency("a", "b").unwrap();
        builder.add_implicit_dependency("b", "a").unwrap();

        assert!(DependencyView::new(&builder.build()).has_project_cycle());
    }
}
