//! Per-file-type dependency scanners

pub mod javascript;
pub mod package_json;

/// Which scanner applies to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// JavaScript or TypeScript module.
    Script,
    /// `package.json` manifest.
    PackageManifest,
}

impl SourceKind {
    /// Detect from a workspace-relative path.
    pub fn from_path(path: &str) -> Option<Self> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if file_name == "package.json" {
            return Some(SourceKind::PackageManifest);
        }
        if file_name.ends_with(".d.ts") {
            return None;
        }
        match file_name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "mts" | "cts") => Some(SourceKind::Script),
            _ => None,
        }
    }
}
