//! Best-effort import graph over the Python files in scope.
//!
//! The graph is context for the model, not analysis we rely on: edges come
//! from a line scan for `import a.b` / `from a.b import c`, and only edges
//! whose target resolves to a module inside the file set are kept. Output
//! is deterministic (`BTreeMap`, sorted edge lists).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:import|from)\s+([A-Za-z_][A-Za-z0-9_.]*)").expect("import regex")
});

/// Dotted module name for a `.py` path, or `None` for non-Python files.
/// `pkg/__init__.py` maps to `pkg`.
fn module_name(rel_path: &Path) -> Option<String> {
    let s = rel_path.to_string_lossy().replace('\\', "/");
    let stem = s.strip_suffix(".py")?;
    let stem = stem.strip_suffix("/__init__").unwrap_or(stem);
    Some(stem.replace('/', "."))
}

/// Map from module to the in-scope modules it imports. Modules with no
/// in-scope imports are omitted.
pub fn python_dep_graph(
    documents: &BTreeMap<PathBuf, String>,
) -> BTreeMap<String, Vec<String>> {
    let modules: BTreeSet<String> = documents
        .keys()
        .filter_map(|p| module_name(p))
        .collect();

    let mut graph = BTreeMap::new();
    for (rel_path, content) in documents {
        let Some(me) = module_name(rel_path) else {
            continue;
        };
        let mut imports = BTreeSet::new();
        for line in content.lines() {
            let Some(caps) = IMPORT_LINE.captures(line) else {
                continue;
            };
            let target = &caps[1];
            // `from a.b import c` may name either the module a.b or an
            // item inside it; accept the longest known prefix.
            if let Some(hit) = known_prefix(target, &modules) {
                if hit != me {
                    imports.insert(hit);
                }
            }
        }
        if !imports.is_empty() {
            graph.insert(me, imports.into_iter().collect());
        }
    }
    graph
}

fn known_prefix(target: &str, modules: &BTreeSet<String>) -> Option<String> {
    let mut candidate = target;
    loop {
        if modules.contains(candidate) {
            return Some(candidate.to_string());
        }
        candidate = candidate.rsplit_once('.')?.0;
    }
}

/// The dependency-graph section of the incremental initial message, or an
/// empty string when there is nothing to say.
pub fn dep_graph_text(documents: &BTreeMap<PathBuf, String>) -> String {
    let graph = python_dep_graph(documents);
    if graph.is_empty() {
        return String::new();
    }
    // Plain data in a BTreeMap; serialization cannot fail.
    let json = serde_json::to_string_pretty(&graph).unwrap_or_default();
    format!("Here is the dependency graph of the codebase:\n{json}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(entries: &[(&str, &str)]) -> BTreeMap<PathBuf, String> {
        entries
            .iter()
            .map(|(p, c)| (PathBuf::from(p), c.to_string()))
            .collect()
    }

    #[test]
    fn module_names_from_paths() {
        assert_eq!(module_name(Path::new("pkg/mod.py")), Some("pkg.mod".into()));
        assert_eq!(module_name(Path::new("pkg/__init__.py")), Some("pkg".into()));
        assert_eq!(module_name(Path::new("README.md")), None);
    }

    #[test]
    fn edges_only_for_in_scope_modules() {
        let documents = docs(&[
            ("app/main.py", "import os\nfrom app.util import helper\n"),
            ("app/util.py", "import json\n"),
        ]);
        let graph = python_dep_graph(&documents);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph["app.main"], vec!["app.util".to_string()]);
    }

    #[test]
    fn from_import_resolves_to_module_prefix() {
        let documents = docs(&[
            ("a.py", "from b import something\n"),
            ("b.py", ""),
        ]);
        let graph = python_dep_graph(&documents);
        assert_eq!(graph["a"], vec!["b".to_string()]);
    }

    #[test]
    fn empty_graph_yields_no_section() {
        let documents = docs(&[("notes.md", "no python here")]);
        assert_eq!(dep_graph_text(&documents), "");
        let documents = docs(&[("solo.py", "import os\n")]);
        assert_eq!(dep_graph_text(&documents), "");
    }

    #[test]
    fn section_text_is_deterministic() {
        let documents = docs(&[
            ("x.py", "import y\nimport z\n"),
            ("y.py", ""),
            ("z.py", ""),
        ]);
        let first = dep_graph_text(&documents);
        assert!(first.starts_with("Here is the dependency graph"));
        assert_eq!(first, dep_graph_text(&documents));
    }
}
