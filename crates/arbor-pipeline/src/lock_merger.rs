//! External graph seeding from the lock manifest or the previous cache

use std::path::Path;

use arbor_core::{CacheSnapshot, NO_LOCK_FILE_HASH, ProjectGraph};
use arbor_indexer::{LockFileError, LockFileParser};

/// Chooses between the cached external graph and a fresh lock file parse.
pub struct LockGraphMerger<'a> {
    parser: &'a dyn LockFileParser,
}

impl<'a> LockGraphMerger<'a> {
    pub fn new(parser: &'a dyn LockFileParser) -> Self {
        LockGraphMerger { parser }
    }

    /// Hash folded into the fingerprint, [`NO_LOCK_FILE_HASH`] when there is no manifest.
    pub fn lock_file_hash(&self, root: &Path) -> Result<String, LockFileError> {
        Ok(self
            .parser
            .lock_file_hash(root)?
            .unwrap_or_else(|| NO_LOCK_FILE_HASH.to_string()))
    }

    /// Partial graph holding only external nodes and edges, if a manifest exists.
    ///
    /// A cached snapshot recorded under the same lock hash is trusted as is.
    pub fn resolve(
        &self,
        root: &Path,
        lock_file_hash: &str,
        cached: Option<&CacheSnapshot>,
    ) -> Result<Option<ProjectGraph>, LockFileError> {
        if lock_file_hash == NO_LOCK_FILE_HASH {
            tracing::debug!("No lock file, external nodes stay empty");
            return Ok(None);
        }

        match cached {
            Some(snapshot) if snapshot.lock_file_hash == lock_file_hash => {
                tracing::debug!("Lock file unchanged, reusing {} cached external nodes", snapshot.external_nodes.len());
                Ok(Some(snapshot.external_partial_graph()))
            }
            _ => {
                let parsed = self.parser.parse(root)?;
                tracing::debug!("Parsed lock file: {} external nodes", parsed.external_nodes.len());
                Ok(Some(parsed.into_partial_graph()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use arbor_core::test_utils::{create_workspace, external};
    use arbor_core::{Fingerprint, WorkspaceConfig};
    use arbor_indexer::{LockFileGraph, NPM_LOCK_FILE, NpmLockFileParser};

    const LOCK: &str = r#"{
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "acme" },
    "node_modules/react": { "version": "18.2.0" }
  }
}"#;

    /// Counts full parses.
    #[derive(Default)]
    struct CountingParser {
        parses: AtomicUsize,
    }

    impl LockFileParser for CountingParser {
        fn lock_file_hash(&self, root: &Path) -> Result<Option<String>, LockFileError> {
            NpmLockFileParser::new().lock_file_hash(root)
        }

        fn parse(&self, root: &Path) -> Result<LockFileGraph, LockFileError> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            NpmLockFileParser::new().parse(root)
        }
    }

    fn snapshot_with_lock_hash(hash: &str) -> CacheSnapshot {
        let mut graph = ProjectGraph::new();
        graph
            .external_nodes
            .insert("npm:cached".into(), external("cached", "1.0.0"));
        let fingerprint = Fingerprint::new(&WorkspaceConfig::default(), &Default::default(), hash);
        CacheSnapshot::new(&graph, &fingerprint)
    }

    #[test]
    fn test_no_lock_file_is_noop() {
        let temp = create_workspace(&[("arbor.toml", "")]);
        let parser = CountingParser::default();
        let merger = LockGraphMerger::new(&parser);

        let hash = merger.lock_file_hash(temp.path()).unwrap();
        assert_eq!(hash, NO_LOCK_FILE_HASH);
        assert!(merger.resolve(temp.path(), &hash, None).unwrap().is_none());
        assert_eq!(parser.parses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_matching_hash_reuses_cache() {
        let temp = create_workspace(&[(NPM_LOCK_FILE, LOCK)]);
        let parser = CountingParser::default();
        let merger = LockGraphMerger::new(&parser);
        let hash = merger.lock_file_hash(temp.path()).unwrap();

        let cached = snapshot_with_lock_hash(&hash);
        let partial = merger.resolve(temp.path(), &hash, Some(&cached)).unwrap().unwrap();

        assert!(partial.external_nodes.contains_key("npm:cached"));
        assert_eq!(parser.parses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_changed_hash_parses_fresh() {
        let temp = create_workspace(&[(NPM_LOCK_FILE, LOCK)]);
        let parser = CountingParser::default();
        let merger = LockGraphMerger::new(&parser);
        let hash = merger.lock_file_hash(temp.path()).unwrap();

        let cached = snapshot_with_lock_hash("stale");
        let partial = merger.resolve(temp.path(), &hash, Some(&cached)).unwrap().unwrap();

        assert!(partial.external_nodes.contains_key("npm:react"));
        assert!(!partial.external_nodes.contains_key("npm:cached"));
        assert!(partial.nodes.is_empty());
        assert_eq!(parser.parses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_lock_file_is_fatal() {
        let temp = create_workspace(&[(NPM_LOCK_FILE, "{ not json")]);
        let parser = NpmLockFileParser::new();
        let merger = LockGraphMerger::new(&parser);
        let hash = merger.lock_file_hash(temp.path()).unwrap();

        assert!(merger.resolve(temp.path(), &hash, None).is_err());
    }
}
