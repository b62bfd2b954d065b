//! Import specifier scanning for JavaScript and TypeScript sources

use std::sync::LazyLock;

use regex::Regex;

/// `import x from 'a'`, `import 'a'`, `export { y } from 'a'`, `export * from 'a'`
static STATIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:import|export)\s+(?:type\s+)?(?:[\w*{}\s,$]+?\s+from\s+)?['"]([^'"\n]+)['"]"#)
        .expect("static import pattern is valid")
});

/// `require('a')`
static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("require pattern is valid")
});

/// `import('a')`
static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("dynamic import pattern is valid")
});

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

/// Module specifiers referenced by `source`, in order of first appearance.
pub fn scan_imports(source: &str) -> Vec<String> {
    let source = strip_comments(source);

    let mut found: Vec<(usize, &str)> = [&*STATIC_IMPORT, &*REQUIRE, &*DYNAMIC_IMPORT]
        .iter()
        .flat_map(|re| re.captures_iter(&source))
        .filter_map(|caps| caps.get(1))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let mut specifiers: Vec<String> = Vec::with_capacity(found.len());
    for (_, spec) in found {
        if !specifiers.iter().any(|s| s == spec) {
            specifiers.push(spec.to_string());
        }
    }
    specifiers
}

/// Blank out block comments and whole-line `//` comments, keeping byte offsets stable.
fn strip_comments(source: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(source, |caps: &regex::Captures| {
        " ".repeat(caps[0].len())
    });

    without_blocks
        .split_inclusive('\n')
        .map(|line| {
            if line.trim_start().starts_with("//") {
                let newline = if line.ends_with('\n') { "\n" } else { "" };
                format!("{}{}", " ".repeat(line.len() - newline.len()), newline)
            } else {
                line.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_import_form_in_order() {
        let source = r#"
import React from 'react';
import type { Props } from "./props";
import './styles.css';
import {
    Button,
    Card,
} from '@acme/ui';
export * from '../shared/util';
export { helper } from '@acme/helpers/deep';
const fs = require('fs');
const Lazy = () => import('./lazy');
"#;

        assert_eq!(
            scan_imports(source),
            vec![
                "react",
                "./props",
                "./styles.css",
                "@acme/ui",
                "../shared/util",
                "@acme/helpers/deep",
                "fs",
                "./lazy",
            ]
        );
    }

    #[test]
    fn ignores_commented_imports_and_duplicates() {
        let source = r#"
// import nope from 'commented-out';
/* import alsoNope from 'block';
   require('still-block'); */
import a from 'lodash';
import b from 'lodash';
"#;
        assert_eq!(scan_imports(source), vec!["lodash"]);
    }

    #[test]
    fn plain_code_has_no_imports() {
        assert!(scan_imports("export const answer = 42;\n").is_empty());
        assert!(scan_imports("").is_empty());
    }
}
