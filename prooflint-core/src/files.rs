//! Enumeration of the files in scope for a check.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use tracing::warn;
use walkdir::WalkDir;

/// Files at or above this size are never text we want to discuss.
const MAX_TEXT_FILE_BYTES: u64 = 100 * 1024;

/// Sorted relative paths of every small UTF-8 text file under `directory`,
/// minus anything matching one of the gitignore-style `filter_paths`
/// patterns.
///
/// Inside a git repository the candidate set comes from `git ls-files`
/// (tracked plus untracked-but-not-ignored), so the repository's own
/// `.gitignore` is honored. Outside one, a plain walk that only skips
/// `.git/` itself.
pub fn get_rel_paths(directory: &Path, filter_paths: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let candidates = if directory.join(".git").exists() {
        match git_listed_files(directory) {
            Ok(rels) => rels,
            Err(e) => {
                warn!("git ls-files failed ({e}), walking the tree instead");
                walk_files(directory)?
            }
        }
    } else {
        walk_files(directory)?
    };

    let mut out = Vec::new();
    for rel in candidates {
        let path = directory.join(&rel);
        let Ok(meta) = std::fs::metadata(&path) else {
            continue;
        };
        if !meta.is_file() || meta.len() >= MAX_TEXT_FILE_BYTES {
            continue;
        }
        // Binary files fail UTF-8 decoding and drop out here.
        if std::fs::read_to_string(&path).is_err() {
            continue;
        }
        if excluded(&rel, filter_paths) {
            continue;
        }
        out.push(rel);
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Tracked files (recursing into submodules) plus untracked files that are
/// not ignored.
fn git_listed_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut rels = Vec::new();
    for extra in [
        &["--recurse-submodules"][..],
        &["--others", "--exclude-standard"][..],
    ] {
        let output = Command::new("git")
            .arg("-C")
            .arg(directory)
            .args(["ls-files", "-z"])
            .args(extra)
            .output()?;
        if !output.status.success() {
            return Err(std::io::Error::other(format!(
                "git ls-files exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        for raw in output.stdout.split(|b| *b == 0) {
            if !raw.is_empty() {
                rels.push(PathBuf::from(String::from_utf8_lossy(raw).into_owned()));
            }
        }
    }
    Ok(rels)
}

fn walk_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(directory)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        out.push(
            entry
                .path()
                .strip_prefix(directory)
                .unwrap_or(entry.path())
                .to_path_buf(),
        );
    }
    Ok(out)
}

fn excluded(rel: &Path, filter_paths: &[String]) -> bool {
    let rel = rel.to_string_lossy().replace('\\', "/");
    filter_paths.iter().any(|p| pattern_matches(&rel, p))
}

/// gitignore-style matching, the commonly used subset:
/// - `*` matches within a segment, `**` across segments, `?` one char
/// - a trailing `/` matches a directory and everything under it
/// - a pattern containing a `/` is anchored at the root; otherwise it may
///   match at any path-segment boundary
fn pattern_matches(rel: &str, pattern: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return false;
    }
    let (pattern, dir_only) = match pattern.strip_suffix('/') {
        Some(p) => (p, true),
        None => (pattern, false),
    };
    let anchored = pattern.starts_with('/') || pattern.contains('/');
    let pattern = pattern.strip_prefix('/').unwrap_or(pattern);

    let mut rx = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    rx.push_str(".*");
                } else {
                    rx.push_str("[^/]*");
                }
            }
            '?' => rx.push_str("[^/]"),
            other => rx.push_str(&regex::escape(&other.to_string())),
        }
    }
    let tail = if dir_only { "/.*" } else { "(/.*)?" };
    let full = if anchored {
        format!("^{rx}{tail}$")
    } else {
        format!("(^|/){rx}{tail}$")
    };
    match Regex::new(&full) {
        Ok(re) => re.is_match(rel),
        Err(_) => false,
    }
}
