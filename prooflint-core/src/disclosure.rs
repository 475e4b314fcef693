//! Run-wide disclosure policy and the per-turn file-request protocol.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Most files the model may be shown in a single follow-up, however many it
/// asked for. Bounds prompt growth and stops one turn from re-disclosing
/// the whole codebase.
pub const MAX_FILES_REQUESTED: usize = 5;

/// Shape of every initial message in a run, and therefore which response
/// schema is legal. Decided once so the prompt shape stays consistent
/// across all properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptShape {
    /// Every file's contents inlined up front; the only legal reply is a
    /// verdict.
    FullDisclosure,
    /// Paths only (plus the target file); the model may request files or
    /// render a verdict.
    Incremental,
}

impl PromptShape {
    /// Pure function of total source length vs the configured threshold.
    pub fn choose(total_source_len: usize, min_length_to_exclude_full_files: usize) -> Self {
        if total_source_len >= min_length_to_exclude_full_files {
            PromptShape::Incremental
        } else {
            PromptShape::FullDisclosure
        }
    }
}

/// Resolve a file-request reply into the concrete set to reveal next.
///
/// Unknown (hallucinated) paths are silently dropped, already-shown files
/// are never re-disclosed, and the remainder is path-sorted and truncated
/// to [`MAX_FILES_REQUESTED`] so the result is deterministic.
pub fn resolve_files_requested(
    requested: &[String],
    known: &BTreeSet<PathBuf>,
    shown: &BTreeSet<PathBuf>,
) -> Vec<PathBuf> {
    let wanted: BTreeSet<PathBuf> = requested.iter().map(PathBuf::from).collect();
    wanted
        .into_iter()
        .filter(|p| known.contains(p) && !shown.contains(p))
        .take(MAX_FILES_REQUESTED)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> BTreeSet<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn shape_flips_exactly_at_the_threshold() {
        assert_eq!(
            PromptShape::choose(99_999, 100_000),
            PromptShape::FullDisclosure
        );
        assert_eq!(
            PromptShape::choose(100_000, 100_000),
            PromptShape::Incremental
        );
        assert_eq!(
            PromptShape::choose(100_001, 100_000),
            PromptShape::Incremental
        );
    }

    #[test]
    fn unknown_and_duplicate_requests_are_dropped() {
        let known = paths(&["a.py"]);
        let shown = BTreeSet::new();
        let requested = vec![
            "a.py".to_string(),
            "missing.py".to_string(),
            "a.py".to_string(),
        ];
        assert_eq!(
            resolve_files_requested(&requested, &known, &shown),
            vec![PathBuf::from("a.py")]
        );
    }

    #[test]
    fn already_shown_files_resolve_to_nothing() {
        let known = paths(&["a.py"]);
        let shown = paths(&["a.py"]);
        let requested = vec![
            "a.py".to_string(),
            "missing.py".to_string(),
            "a.py".to_string(),
        ];
        assert!(resolve_files_requested(&requested, &known, &shown).is_empty());
    }

    #[test]
    fn oversized_requests_keep_the_lexicographically_smallest() {
        let known = paths(&["a.py", "b.py", "c.py", "d.py", "e.py", "f.py", "g.py", "h.py"]);
        let shown = BTreeSet::new();
        // Requested in scrambled order; resolution must not depend on it.
        let requested: Vec<String> = ["h.py", "c.py", "a.py", "f.py", "b.py", "g.py", "e.py", "d.py"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let resolved = resolve_files_requested(&requested, &known, &shown);
        assert_eq!(
            resolved,
            vec![
                PathBuf::from("a.py"),
                PathBuf::from("b.py"),
                PathBuf::from("c.py"),
                PathBuf::from("d.py"),
                PathBuf::from("e.py"),
            ]
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let known = paths(&["x.py", "y.py", "z.py"]);
        let shown = paths(&["y.py"]);
        let requested = vec!["z.py".to_string(), "x.py".to_string(), "y.py".to_string()];
        let first = resolve_files_requested(&requested, &known, &shown);
        let second = resolve_files_requested(&requested, &known, &shown);
        assert_eq!(first, second);
        assert_eq!(first, vec![PathBuf::from("x.py"), PathBuf::from("z.py")]);
    }
}
