//! Root-relative path resolution.
//!
//! `original_source/src/patchstudio/core/applier.py` resolves with `(root / rel).resolve()`
//! and then checks `relative_to(root)`, which works even for paths that do
//! not yet exist (as for a `create` operation's parent). `Path::canonicalize`
//! requires the full path to exist, so this module canonicalizes only the
//! root and lexically normalizes the joined relative path, per the REDESIGN
//! note in `spec.md` §9 against naive string-prefix checks.

use std::path::{Component, Path, PathBuf};

/// Lexically collapses `.` and `..` components without touching the
/// filesystem (a `..` at the start of what remains is preserved, so escape
/// attempts surface as a path that does not start with the root).
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves `rel` against `root`, returning `None` if the result would
/// escape `root` (including via `..` traversal). `root` itself must exist.
pub fn resolve_within_root(root: &Path, rel: &str) -> Option<PathBuf> {
    let canonical_root = root.canonicalize().ok()?;
    let joined = canonical_root.join(rel);
    let normalized = lexical_normalize(&joined);
    if normalized.starts_with(&canonical_root) {
        Some(normalized)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_simple_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_within_root(dir.path(), "src/main.rs").unwrap();
        assert!(resolved.ends_with("src/main.rs"));
    }

    #[test]
    fn rejects_parent_traversal_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_within_root(dir.path(), "../outside.txt");
        assert!(resolved.is_none());
    }

    #[test]
    fn allows_nonexistent_path_for_create() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let resolved = resolve_within_root(dir.path(), "sub/new_file.txt").unwrap();
        assert!(resolved.ends_with("sub/new_file.txt"));
    }
}
