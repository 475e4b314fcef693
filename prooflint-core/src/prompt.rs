//! Message construction for the proof-check conversation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::checker::PropertyLocation;
use crate::disclosure::{PromptShape, MAX_FILES_REQUESTED};

/// Shared rubric: what the three verdicts mean.
const CORRECTNESS_RUBRIC: &str = r#"By "correct", we mean very high confidence that each step of the proof is valid,
the proof does in fact prove the proposition, and that the proof is supported by
what the code does. Mark the proof as "incorrect" if you understand it and the
code but the proof is wrong. Use "unknown" if e.g. you don't 100% know how an
external library works, or the proof needs more detail. Skeptically and
rigorously check every claim with references to the code. If the proof
references an explicitly-stated axiom (or "assumption", etc), you can assume
that the axiom is correct."#;

/// One file quoted for the model, with a banner and a line-number gutter.
pub fn format_file(content: &str, rel_path: &Path) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let width = decimal_width(lines.len());
    let numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$} | {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "================\n{} (line numbers added)\n================\n\n{numbered}\n\n",
        rel_path.display()
    )
}

fn decimal_width(n: usize) -> usize {
    let mut width = 1;
    let mut n = n / 10;
    while n > 0 {
        width += 1;
        n /= 10;
    }
    width
}

fn listing(rel_paths: &[PathBuf]) -> String {
    rel_paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn quoted(files: &[PathBuf], documents: &BTreeMap<PathBuf, String>) -> String {
    files
        .iter()
        .map(|p| format_file(documents.get(p).map(String::as_str).unwrap_or(""), p))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Initial message for one property, in the shape fixed for the run.
pub fn initial_message(
    shape: PromptShape,
    rel_paths: &[PathBuf],
    documents: &BTreeMap<PathBuf, String>,
    deps_text: &str,
    location: &PropertyLocation,
) -> String {
    match shape {
        PromptShape::FullDisclosure => format!(
            r#"The following is a listing of all files in a codebase:
{listing}

At the end of this message is a listing of all file contents.

The file {target} contains one or more propositions
about the codebase. The proposition we are interested in is on line
{line}, and is followed by a proof.

In your response, state whether the proof (not the proposition) is correct.
{rubric}

File contents:
{contents}"#,
            listing = listing(rel_paths),
            target = location.rel_path.display(),
            line = location.line_num,
            rubric = CORRECTNESS_RUBRIC,
            contents = quoted(rel_paths, documents),
        ),
        PromptShape::Incremental => format!(
            r#"The following is a listing of all files in a codebase:
{listing}

{deps}At the end of this message is a listing of the contents of {target}.
This file contains one or more propositions
about the codebase. The proposition we are interested in is on line
{line}, and is followed by a proof.

The goal of this conversation is to determine whether the proof
(not the proposition) is correct.

Your responses in this conversation can be one of the following.

1. Request files

In this response, you may request to see additional files from the codebase in
order to ultimately determine whether the proof is correct. They will be
provided to you in the next message. You will have the opportunity to request
further files if needed, and we will repeat this process until you are ready to
make a final determination. You can request up to {max_files} files
at a time.

2. Correctness verdict

In this response, state whether the proof is correct.
{rubric}
(Use this response only if you have seen enough of
the codebase to make a determination.)

File contents:
{contents}"#,
            listing = listing(rel_paths),
            deps = deps_text,
            target = location.rel_path.display(),
            line = location.line_num,
            max_files = MAX_FILES_REQUESTED,
            rubric = CORRECTNESS_RUBRIC,
            contents = quoted(std::slice::from_ref(&location.rel_path), documents),
        ),
    }
}

/// Follow-up message for one file-request turn: only the newly resolved
/// files are quoted.
pub fn followup_message(files: &[PathBuf], documents: &BTreeMap<PathBuf, String>) -> String {
    format!(
        "The requested files are given below.\n\n{}",
        quoted(files, documents)
    )
}
