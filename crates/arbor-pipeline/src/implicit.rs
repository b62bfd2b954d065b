//! Configuration-declared project dependencies

use std::collections::BTreeMap;

use arbor_core::{GraphError, ProjectConfig, ProjectGraphBuilder};

/// Expand `"*"` (every other project) and `"!name"` (exclude) into concrete targets.
pub fn implicit_targets(project: &str, declared: &[String], projects: &BTreeMap<String, ProjectConfig>) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    let mut excluded: Vec<&str> = Vec::new();

    for entry in declared {
        if let Some(name) = entry.strip_prefix('!') {
            excluded.push(name);
        } else if entry == "*" {
            for name in projects.keys() {
                if !targets.contains(name) {
                    targets.push(name.clone());
                }
            }
        } else if !targets.contains(entry) {
            targets.push(entry.clone());
        }
    }

    targets.retain(|t| t != project && !excluded.contains(&t.as_str()));
    targets
}

/// Add an implicit edge for every declared dependency of every project.
pub fn add_implicit_dependencies(
    builder: &mut ProjectGraphBuilder,
    projects: &BTreeMap<String, ProjectConfig>,
) -> Result<usize, GraphError> {
    let mut added = 0;
    for (name, project) in projects {
        for target in implicit_targets(name, &project.implicit_dependencies, projects) {
            builder.add_implicit_dependency(name, &target)?;
            added += 1;
        }
    }
    Ok(added)
}
