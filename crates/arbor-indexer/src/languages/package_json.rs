//! Dependency names declared in a `package.json` manifest

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Every declared dependency name, section by section, without duplicates.
pub fn dependency_names(content: &str) -> serde_json::Result<Vec<String>> {
    let manifest: PackageManifest = serde_json::from_str(content)?;

    let mut names: Vec<String> = Vec::new();
    for section in [
        &manifest.dependencies,
        &manifest.dev_dependencies,
        &manifest.peer_dependencies,
        &manifest.optional_dependencies,
    ] {
        for name in section.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    Ok(names)
}

/// The `name` field, if the manifest parses and has one.
pub fn package_name(content: &str) -> Option<String> {
    serde_json::from_str::<PackageManifest>(content)
        .ok()
        .and_then(|m| m.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_all_sections() {
        let content = r#"{
            "name": "@acme/web",
            "dependencies": { "react": "^18.2.0", "@acme/ui": "*" },
            "devDependencies": { "typescript": "5.4.0", "react": "^18.2.0" },
            "peerDependencies": { "react-dom": "^18" }
        }"#;

        assert_eq!(
            dependency_names(content).unwrap(),
            vec!["@acme/ui", "react", "typescript", "react-dom"]
        );
        assert_eq!(package_name(content).as_deref(), Some("@acme/web"));
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        assert!(dependency_names("{ \"dependencies\": ").is_err());
        assert!(package_name("nope").is_none());
    }
}
