//! Resolve import specifiers to project or external node names

use std::collections::{BTreeMap, HashMap};

use arbor_core::ProjectGraph;

/// Maps specifiers found in a file to the graph node they refer to.
pub struct TargetResolver<'a> {
    graph: &'a ProjectGraph,
    /// (root, project name), longest root first.
    roots: Vec<(&'a str, &'a str)>,
    path_mappings: &'a BTreeMap<String, Vec<String>>,
    package_names: &'a HashMap<String, String>,
}

impl<'a> TargetResolver<'a> {
    pub fn new(
        graph: &'a ProjectGraph,
        path_mappings: &'a BTreeMap<String, Vec<String>>,
        package_names: &'a HashMap<String, String>,
    ) -> Self {
        let mut roots: Vec<(&str, &str)> = graph
            .nodes
            .values()
            .map(|n| match n.root.trim_end_matches('/') {
                "." => ("", n.name.as_str()),
                root => (root, n.name.as_str()),
            })
            .collect();
        roots.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.1.cmp(b.1)));

        TargetResolver {
            graph,
            roots,
            path_mappings,
            package_names,
        }
    }

    /// Resolve `specifier` as written in `source_file`.
    pub fn resolve(&self, source_file: &str, specifier: &str) -> Option<String> {
        if let Some(project) = self.resolve_path_mapping(specifier) {
            return Some(project);
        }

        if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            let dir = source_file.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
            let joined = if dir.is_empty() {
                specifier.to_string()
            } else {
                format!("{dir}/{specifier}")
            };
            return normalize(&joined).and_then(|p| self.project_for_path(&p));
        }
        if specifier.starts_with('/') {
            return None;
        }

        self.resolve_package(specifier)
    }

    /// Resolve a bare package name (`react`, `@acme/ui`, `lodash/fp`).
    pub fn resolve_package(&self, specifier: &str) -> Option<String> {
        let package = package_root(specifier);
        if let Some(project) = self.package_names.get(package) {
            if self.graph.nodes.contains_key(project) {
                return Some(project.clone());
            }
        }
        let external = format!("npm:{package}");
        self.graph
            .external_nodes
            .contains_key(&external)
            .then_some(external)
    }

    /// The project owning a workspace-relative path.
    pub fn project_for_path(&self, path: &str) -> Option<String> {
        self.roots
            .iter()
            .find(|(root, _)| {
                root.is_empty()
                    || path == *root
                    || (path.starts_with(root) && path.as_bytes().get(root.len()) == Some(&b'/'))
            })
            .map(|(_, name)| name.to_string())
    }

    fn resolve_path_mapping(&self, specifier: &str) -> Option<String> {
        // exact aliases win over deep imports, which win over wildcards
        if let Some(targets) = self.path_mappings.get(specifier) {
            return self.first_project(targets, "");
        }
        for (alias, targets) in self.path_mappings {
            if alias.contains('*') {
                continue;
            }
            if specifier.starts_with(alias.as_str()) && specifier.as_bytes().get(alias.len()) == Some(&b'/') {
                return self.first_project(targets, "");
            }
        }
        for (alias, targets) in self.path_mappings {
            let Some((prefix, suffix)) = alias.split_once('*') else {
                continue;
            };
            if specifier.len() >= prefix.len() + suffix.len()
                && specifier.starts_with(prefix)
                && specifier.ends_with(suffix)
            {
                let captured = &specifier[prefix.len()..specifier.len() - suffix.len()];
                if let Some(project) = self.first_project(targets, captured) {
                    return Some(project);
                }
            }
        }
        None
    }

    fn first_project(&self, targets: &[String], captured: &str) -> Option<String> {
        targets.iter().find_map(|target| {
            let path = target.replace('*', captured);
            let path = path.trim_start_matches("./");
            normalize(path).and_then(|p| self.project_for_path(&p))
        })
    }
}

/// `@scope/name/deep` -> `@scope/name`, `name/deep` -> `name`.
pub fn package_root(specifier: &str) -> &str {
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next().unwrap_or(specifier);
    if first.starts_with('@') {
        match parts.next() {
            Some(second) => &specifier[..first.len() + 1 + second.len()],
            None => specifier,
        }
    } else {
        first
    }
}

/// Collapse `.` and `..` segments. `None` if the path escapes the workspace.
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}
