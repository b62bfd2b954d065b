//! Core data structures for the project graph

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Files of each project, keyed by project name.
pub type ProjectFileMap = BTreeMap<String, Vec<FileData>>;

/// What kind of workspace project a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    App,
    Lib,
    E2e,
}

/// A single file owned by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    /// Workspace-relative path with `/` separators.
    pub file: String,
    /// Content hash reported by the scanner.
    pub hash: String,
    /// Projects (or external nodes) this file depends on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deps: Option<Vec<String>>,
}

impl FileData {
    pub fn new(file: impl Into<String>, hash: impl Into<String>) -> Self {
        FileData {
            file: file.into(),
            hash: hash.into(),
            deps: None,
        }
    }
}

/// A buildable workspace project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub name: String,
    pub kind: ProjectKind,
    pub root: String,
    pub files: Vec<FileData>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ProjectNode {
    pub fn file(&self, path: &str) -> Option<&FileData> {
        self.files.iter().find(|f| f.file == path)
    }
}

/// A package outside the workspace, e.g. `npm:react`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalNode {
    pub name: String,
    pub package_name: String,
    pub version: String,
}

/// How a dependency edge was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Found by analyzing an import or a manifest entry.
    Static,
    /// Not produced by source analysis, which records lazy `import()` as
    /// `Static`; available to graph processors.
    Dynamic,
    /// Declared in configuration.
    Implicit,
}

/// A directed edge in the project graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: DependencyKind) -> Self {
        Dependency {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

/// Workspace projects, external packages and the edges between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub nodes: BTreeMap<String, ProjectNode>,
    #[serde(default)]
    pub external_nodes: BTreeMap<String, ExternalNode>,
    pub dependencies: BTreeMap<String, Vec<Dependency>>,
}

impl ProjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `name` is a workspace project or an external node.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name) || self.external_nodes.contains_key(name)
    }

    /// Outgoing edges of `source`.
    pub fn dependencies_of(&self, source: &str) -> &[Dependency] {
        self.dependencies
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_dependency(&self, source: &str, target: &str, kind: DependencyKind) -> bool {
        self.dependencies_of(source)
            .iter()
            .any(|d| d.target == target && d.kind == kind)
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }

    /// Every edge, ordered by source name then insertion.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values().flatten()
    }

    /// The workspace-project files with their current `deps`.
    pub fn file_map(&self) -> ProjectFileMap {
        self.nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.files.clone()))
            .collect()
    }
}
