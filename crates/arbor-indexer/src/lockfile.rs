//! External nodes and edges from an npm `package-lock.json`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arbor_core::{Dependency, DependencyKind, ExternalNode, ProjectGraph};
use serde::Deserialize;
use thiserror::Error;

use crate::scanner::hash_content;

pub const NPM_LOCK_FILE: &str = "package-lock.json";

const NODE_MODULES: &str = "node_modules/";

#[derive(Debug, Error)]
pub enum LockFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed lock file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported lockfileVersion {version} in {path}")]
    UnsupportedVersion { path: PathBuf, version: u64 },
}

/// External part of the graph described by a lock manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockFileGraph {
    pub external_nodes: BTreeMap<String, ExternalNode>,
    pub dependencies: BTreeMap<String, Vec<Dependency>>,
    pub manifest_hash: String,
}

impl LockFileGraph {
    /// A graph holding only the external nodes and their edges.
    pub fn into_partial_graph(self) -> ProjectGraph {
        ProjectGraph {
            external_nodes: self.external_nodes,
            dependencies: self.dependencies,
            ..ProjectGraph::new()
        }
    }
}

/// Reads the package manager's lock manifest.
pub trait LockFileParser: Send + Sync {
    /// Content hash of the manifest, `None` if the workspace has none yet.
    fn lock_file_hash(&self, root: &Path) -> Result<Option<String>, LockFileError>;

    fn parse(&self, root: &Path) -> Result<LockFileGraph, LockFileError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageLock {
    #[serde(default)]
    lockfile_version: u64,
    #[serde(default)]
    packages: BTreeMap<String, LockedPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockedPackage {
    version: Option<String>,
    #[serde(default)]
    link: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
}

/// `package-lock.json` (lockfileVersion 2 and 3) parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmLockFileParser;

impl NpmLockFileParser {
    pub fn new() -> Self {
        NpmLockFileParser
    }

    fn read(&self, root: &Path) -> Result<Option<(PathBuf, String)>, LockFileError> {
        let path = root.join(NPM_LOCK_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some((path, content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LockFileError::Io { path, source }),
        }
    }

    /// Parse manifest content already in memory.
    pub fn parse_content(&self, path: &Path, content: &str) -> Result<LockFileGraph, LockFileError> {
        let lock: PackageLock = serde_json::from_str(content).map_err(|source| LockFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if !(2..=3).contains(&lock.lockfile_version) {
            return Err(LockFileError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: lock.lockfile_version,
            });
        }

        // install path -> node name
        let mut installed: BTreeMap<&str, String> = BTreeMap::new();
        let mut external_nodes = BTreeMap::new();

        for (install_path, package) in &lock.packages {
            if package.link || !install_path.starts_with(NODE_MODULES) {
                continue;
            }
            let (Some(package_name), Some(version)) = (package_name(install_path), package.version.as_ref()) else {
                continue;
            };
            let name = if is_nested(install_path) {
                format!("npm:{package_name}@{version}")
            } else {
                format!("npm:{package_name}")
            };
            installed.insert(install_path.as_str(), name.clone());
            external_nodes.insert(
                name.clone(),
                ExternalNode {
                    name,
                    package_name: package_name.to_string(),
                    version: version.clone(),
                },
            );
        }

        let mut dependencies: BTreeMap<String, Vec<Dependency>> = BTreeMap::new();
        for (install_path, source) in &installed {
            let package = &lock.packages[*install_path];
            for dep in package
                .dependencies
                .keys()
                .chain(package.optional_dependencies.keys())
                .chain(package.peer_dependencies.keys())
            {
                let Some(target) = resolve_install_path(install_path, dep, &installed) else {
                    continue;
                };
                let edges = dependencies.entry(source.clone()).or_default();
                let edge = Dependency::new(source.clone(), target.clone(), DependencyKind::Static);
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }

        Ok(LockFileGraph {
            external_nodes,
            dependencies,
            manifest_hash: hash_content(content.as_bytes()),
        })
    }
}

impl LockFileParser for NpmLockFileParser {
    fn lock_file_hash(&self, root: &Path) -> Result<Option<String>, LockFileError> {
        Ok(self
            .read(root)?
            .map(|(_, content)| hash_content(content.as_bytes())))
    }

    fn parse(&self, root: &Path) -> Result<LockFileGraph, LockFileError> {
        match self.read(root)? {
            Some((path, content)) => self.parse_content(&path, &content),
            None => Ok(LockFileGraph::default()),
        }
    }
}

/// `node_modules/a/node_modules/@s/b` -> `@s/b`
fn package_name(install_path: &str) -> Option<&str> {
    install_path
        .rsplit_once(NODE_MODULES)
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
}

fn is_nested(install_path: &str) -> bool {
    install_path[NODE_MODULES.len()..].contains(NODE_MODULES)
}

/// Node resolution: look in the nearest `node_modules`, then each ancestor.
fn resolve_install_path<'a>(from: &str, dep: &str, installed: &'a BTreeMap<&str, String>) -> Option<&'a String> {
    let mut base = from;
    loop {
        if let Some(target) = installed.get(format!("{base}/{NODE_MODULES}{dep}").as_str()) {
            return Some(target);
        }
        match base.rfind(&format!("/{NODE_MODULES}")) {
            Some(idx) => base = &base[..idx],
            None => break,
        }
    }
    installed.get(format!("{NODE_MODULES}{dep}").as_str())
}
