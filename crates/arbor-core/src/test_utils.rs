//! Test utilities for Arbor

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use tempfile::TempDir;

use crate::config::ProjectConfig;
use crate::model::*;

pub fn file(path: &str, hash: &str) -> FileData {
    FileData::new(path, hash)
}

/// A project node whose files all hash to `"h:<path>"`.
pub fn project(name: &str, kind: ProjectKind, root: &str, files: &[&str]) -> ProjectNode {
    ProjectNode {
        name: name.to_string(),
        kind,
        root: root.to_string(),
        files: files.iter().map(|f| file(f, &format!("h:{f}"))).collect(),
        tags: BTreeSet::new(),
    }
}

pub fn project_config(root: &str, kind: ProjectKind) -> ProjectConfig {
    ProjectConfig {
        root: root.to_string(),
        kind,
        tags: BTreeSet::new(),
        implicit_dependencies: Vec::new(),
    }
}

pub fn external(package: &str, version: &str) -> ExternalNode {
    ExternalNode {
        name: format!("npm:{package}"),
        package_name: package.to_string(),
        version: version.to_string(),
    }
}

/// `app -> ui -> npm:react -> npm:scheduler`, with per-file deps filled in.
pub fn sample_graph() -> ProjectGraph {
    let mut app = project("app", ProjectKind::App, "apps/app", &["apps/app/main.ts"]);
    app.files[0].deps = Some(vec!["ui".into()]);
    let mut ui = project("ui", ProjectKind::Lib, "libs/ui", &["libs/ui/index.ts"]);
    ui.files[0].deps = Some(vec!["npm:react".into()]);

    ProjectGraph {
        version: Some(crate::cache::SCHEMA_VERSION.to_string()),
        nodes: BTreeMap::from([("app".into(), app), ("ui".into(), ui)]),
        external_nodes: BTreeMap::from([
            ("npm:react".into(), external("react", "18.2.0")),
            ("npm:scheduler".into(), external("scheduler", "0.23.0")),
        ]),
        dependencies: BTreeMap::from([
            (
                "app".into(),
                vec![Dependency::new("app", "ui", DependencyKind::Static)],
            ),
            (
                "ui".into(),
                vec![Dependency::new("ui", "npm:react", DependencyKind::Static)],
            ),
            (
                "npm:react".into(),
                vec![Dependency::new("npm:react", "npm:scheduler", DependencyKind::Static)],
            ),
        ]),
    }
}

/// Create a temporary workspace with the given files.
pub fn create_workspace(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// Generate `count` source files under `root`, each importing `import_target` if given.
pub fn generated_sources(root: &str, count: usize, import_target: Option<&str>) -> Vec<(String, String)> {
    (0..count)
        .map(|i| {
            let body = match import_target {
                Some(target) => format!("import {{ x{i} }} from '{target}';\nexport const v{i} = x{i};\n"),
                None => format!("export const v{i} = {i};\n"),
            };
            (format!("{root}/src/file{i:03}.ts"), body)
        })
        .collect()
}
