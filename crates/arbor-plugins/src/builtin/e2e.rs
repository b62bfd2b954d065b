use anyhow::Result;
use arbor_core::{ProjectGraph, ProjectGraphBuilder, ProjectKind};

use crate::plugin::{GraphProcessor, ProcessorContext};

pub const E2E_APP_LINK: &str = "e2e-app-link";

const E2E_SUFFIX: &str = "-e2e";

/// Links every `<app>-e2e` project to `<app>` with an implicit edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct E2eAppLinkProcessor;

#[async_trait::async_trait]
impl GraphProcessor for E2eAppLinkProcessor {
    async fn process(&self, graph: ProjectGraph, _context: &ProcessorContext<'_>) -> Result<ProjectGraph> {
        let links: Vec<(String, String)> = graph
            .nodes
            .values()
            .filter(|node| node.kind == ProjectKind::E2e)
            .filter_map(|node| {
                let app = node.name.strip_suffix(E2E_SUFFIX)?;
                graph
                    .nodes
                    .contains_key(app)
                    .then(|| (node.name.clone(), app.to_string()))
            })
            .collect();

        let mut builder = ProjectGraphBuilder::from_graph(graph);
        for (e2e, app) in links {
            tracing::debug!("Linking {} to {}", e2e, app);
            builder.add_implicit_dependency(&e2e, &app)?;
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::test_utils::project;
    use arbor_core::{DependencyKind, ProjectFileMap, WorkspaceConfig};

    #[tokio::test]
    async fn test_links_e2e_projects_to_apps() {
        let mut graph = ProjectGraph::new();
        for node in [
            project("web", ProjectKind::App, "apps/web", &[]),
            project("web-e2e", ProjectKind::E2e, "apps/web-e2e", &[]),
            project("admin-e2e", ProjectKind::E2e, "apps/admin-e2e", &[]),
            project("ui-e2e", ProjectKind::Lib, "libs/ui-e2e", &[]),
            project("ui", ProjectKind::Lib, "libs/ui", &[]),
        ] {
            graph.nodes.insert(node.name.clone(), node);
        }
        let config = WorkspaceConfig::default();
        let files = ProjectFileMap::new();
        let context = ProcessorContext {
            workspace: &config,
            file_map: &files,
            files_to_process: &files,
        };

        let graph = E2eAppLinkProcessor.process(graph, &context).await.unwrap();

        assert!(graph.has_dependency("web-e2e", "web", DependencyKind::Implicit));
        assert_eq!(graph.edge_count(), 1);
    }
}
