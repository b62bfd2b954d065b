//! Workspace file scanning and content hashing

use std::path::Path;

use anyhow::{Context, Result};
use arbor_core::{FileData, ProjectFileMap, WorkspaceConfig};
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};

/// Produces, per project, the ordered list of files with their content hashes.
pub trait WorkspaceScanner: Send + Sync {
    fn scan(&self, root: &Path, config: &WorkspaceConfig) -> Result<ProjectFileMap>;
}

/// Walks project roots on disk, honoring `.gitignore`.
#[derive(Debug, Clone, Default)]
pub struct FsWorkspaceScanner;

impl FsWorkspaceScanner {
    pub fn new() -> Self {
        FsWorkspaceScanner
    }
}

impl WorkspaceScanner for FsWorkspaceScanner {
    fn scan(&self, root: &Path, config: &WorkspaceConfig) -> Result<ProjectFileMap> {
        let mut roots: Vec<(String, &str)> = config
            .projects
            .iter()
            .map(|(name, project)| (normalize_root(&project.root), name.as_str()))
            .collect();
        roots.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.1.cmp(b.1)));

        let mut file_map = ProjectFileMap::new();
        for (project_root, name) in &roots {
            let mut files = Vec::new();
            let dir = root.join(project_root);
            if !dir.is_dir() {
                tracing::debug!("Project {} has no directory at {}", name, dir.display());
                file_map.insert(name.to_string(), files);
                continue;
            }

            let walker = WalkBuilder::new(&dir)
                .hidden(true)
                .git_ignore(true)
                .require_git(false)
                .filter_entry(|entry| entry.file_name() != "node_modules")
                .build();

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let Some(relative) = relative_path(root, entry.path()) else {
                    continue;
                };
                if owner(&roots, &relative) != Some(*name) {
                    continue;
                }

                let content = std::fs::read(entry.path())
                    .with_context(|| format!("Failed to read {}", entry.path().display()))?;
                files.push(FileData::new(relative, hash_content(&content)));
            }

            files.sort_by(|a, b| a.file.cmp(&b.file));
            file_map.insert(name.to_string(), files);
        }

        Ok(file_map)
    }
}

/// Hex-encoded SHA-256 of `content`.
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

fn normalize_root(root: &str) -> String {
    match root.trim_start_matches("./").trim_end_matches('/') {
        "." => String::new(),
        other => other.to_string(),
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

fn owner<'a>(roots: &[(String, &'a str)], path: &str) -> Option<&'a str> {
    roots
        .iter()
        .find(|(root, _)| {
            root.is_empty() || (path.starts_with(root.as_str()) && path.as_bytes().get(root.len()) == Some(&b'/'))
        })
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::ProjectKind;
    use arbor_core::test_utils::{create_workspace, project_config};

    fn config(projects: &[(&str, &str)]) -> WorkspaceConfig {
        let mut config = WorkspaceConfig::default();
        for (name, root) in projects {
            config
                .projects
                .insert(name.to_string(), project_config(root, ProjectKind::Lib));
        }
        config
    }

    #[test]
    fn test_scan_assigns_files_to_deepest_project() {
        let temp = create_workspace(&[
            ("libs/ui/src/button.ts", "export const b = 1;"),
            ("libs/ui/icons/src/star.ts", "export const s = 1;"),
            ("libs/ui/node_modules/dep/index.js", "module.exports = {};"),
            ("apps/web/src/main.ts", "import '@acme/ui';"),
        ]);
        let config = config(&[("ui", "libs/ui"), ("icons", "libs/ui/icons"), ("web", "apps/web"), ("ghost", "libs/ghost")]);

        let files = FsWorkspaceScanner::new().scan(temp.path(), &config).unwrap();

        let names = |p: &str| files[p].iter().map(|f| f.file.clone()).collect::<Vec<_>>();
        assert_eq!(names("ui"), vec!["libs/ui/src/button.ts"]);
        assert_eq!(names("icons"), vec!["libs/ui/icons/src/star.ts"]);
        assert_eq!(names("web"), vec!["apps/web/src/main.ts"]);
        assert!(files["ghost"].is_empty());
    }

    #[test]
    fn test_scan_respects_gitignore_and_hashes_content() {
        let temp = create_workspace(&[
            ("libs/ui/.gitignore", "dist/\n"),
            ("libs/ui/dist/out.js", "built"),
            ("libs/ui/a.ts", "same"),
            ("libs/ui/b.ts", "same"),
            ("libs/ui/c.ts", "different"),
        ]);
        let files = FsWorkspaceScanner::new()
            .scan(temp.path(), &config(&[("ui", "libs/ui")]))
            .unwrap();

        let ui = &files["ui"];
        assert_eq!(ui.len(), 3);
        assert_eq!(ui[0].hash, ui[1].hash);
        assert_ne!(ui[0].hash, ui[2].hash);
        assert_eq!(ui[0].hash, hash_content(b"same"));
        assert!(ui.iter().all(|f| f.deps.is_none()));
    }

    #[test]
    fn test_hash_content_is_hex_sha256() {
        assert_eq!(
            hash_content(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
