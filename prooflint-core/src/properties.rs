//! Extraction of proposition+proof pairs from file text.
//!
//! Propositions are pandoc-style fenced divs: a `::: {.theorem #id}` block
//! closed by a bare `:::`, followed (only whitespace between) by a
//! `::: {.proof}` block. A theorem without a trailing proof block is not a
//! checkable property and is skipped. Block content may contain colons,
//! just not a bare `:::` line.

use once_cell::sync::Lazy;
use regex::Regex;

static THEOREM_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^::: \{\.theorem #([^\s}]+)\}").expect("theorem opener regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposition {
    /// 1-based line of the `::: {.theorem ...}` opener.
    pub line_num: usize,
    /// The theorem block body, without the fences.
    pub statement: String,
}

/// Scan `text` for theorem blocks followed by proof blocks.
///
/// `filter` is an optional case-insensitive substring match over the
/// statement text; non-matching propositions are dropped.
pub fn extract_propositions(text: &str, filter: Option<&str>) -> Vec<Proposition> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !THEOREM_OPENER.is_match(lines[i].trim()) {
            i += 1;
            continue;
        }
        let opener = i;
        let Some(close) = find_fence_close(&lines, opener + 1) else {
            break;
        };
        // Only whitespace may separate the theorem from its proof.
        let mut next = close + 1;
        while next < lines.len() && lines[next].trim().is_empty() {
            next += 1;
        }
        if next < lines.len() && lines[next].trim().starts_with("::: {.proof}") {
            let Some(proof_close) = find_fence_close(&lines, next + 1) else {
                break;
            };
            out.push(Proposition {
                line_num: opener + 1,
                statement: lines[opener + 1..close].join("\n").trim().to_string(),
            });
            i = proof_close + 1;
        } else {
            i = close + 1;
        }
    }
    if let Some(needle) = filter {
        let needle = needle.to_lowercase();
        out.retain(|p| p.statement.to_lowercase().contains(&needle));
    }
    out
}

fn find_fence_close(lines: &[&str], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&j| lines[j].trim() == ":::")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_nums(text: &str) -> Vec<usize> {
        extract_propositions(text, None)
            .into_iter()
            .map(|p| p.line_num)
            .collect()
    }

    #[test]
    fn basic_theorem_proof_pair() {
        let text = "\n    ::: {.theorem #basic}\n    Simple theorem\n    :::\n    ::: {.proof}\n    Simple proof\n    :::\n";
        let props = extract_propositions(text, None);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].line_num, 2);
        assert_eq!(props[0].statement.trim(), "Simple theorem");
    }

    #[test]
    fn multiple_theorem_proof_pairs() {
        let text = "\n::: {.theorem #first}\nFirst theorem\n:::\n::: {.proof}\nFirst proof\n:::\n\n::: {.theorem #second}\nSecond theorem\n:::\n::: {.proof}\nSecond proof\n:::\n";
        assert_eq!(line_nums(text), vec![2, 9]);
    }

    #[test]
    fn theorem_without_proof_is_ignored() {
        let text = "\n::: {.theorem #with_proof}\nThis one has a proof\n:::\n::: {.proof}\nHere's the proof\n:::\n\n::: {.theorem #no_proof}\nThis one doesn't have a proof\n:::\n";
        let props = extract_propositions(text, None);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].line_num, 2);
    }

    #[test]
    fn colons_in_content_are_fine() {
        let text = "\n::: {.theorem #colon_test}\nThis theorem: has some: colons in it\n:::\n::: {.proof}\nThis proof: also has: some colons: in it\n:::\n";
        let props = extract_propositions(text, None);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].statement, "This theorem: has some: colons in it");
    }

    #[test]
    fn empty_content_blocks() {
        let text = "\n::: {.theorem #empty}\n:::\n::: {.proof}\n:::\n";
        let props = extract_propositions(text, None);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].statement, "");
    }

    #[test]
    fn no_theorems_at_all() {
        let text = "Just some regular text without any theorem blocks";
        assert!(extract_propositions(text, None).is_empty());
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let text = "::: {.theorem #a}\nAddition commutes\n:::\n::: {.proof}\nobvious\n:::\n::: {.theorem #b}\nSorting is stable\n:::\n::: {.proof}\nalso obvious\n:::\n";
        let props = extract_propositions(text, Some("SORTING"));
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].statement, "Sorting is stable");
        assert!(extract_propositions(text, Some("nonexistent")).is_empty());
    }
}
