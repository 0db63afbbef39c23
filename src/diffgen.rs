//! Generates unified diff text from baseline/output text pairs.
//!
//! Grounded in `original_source/src/patchstudio/core/diffgen.py` (`DiffGenerator`), using the
//! `similar` crate's `TextDiff::unified_diff` instead of `difflib` — the
//! same approach taken by `other_examples/3256f035_Romelium-mpatch__src-lib.rs.rs`
//! for the same kind of patch-apply tool.

use std::collections::BTreeMap;

use similar::TextDiff;

use crate::model::{Operation, PatchSet};
use crate::normalizer::fold_line_endings;

/// Produces a unified diff between `old_text` and `new_text`, labeled with
/// `old_path`/`new_path` in the `---`/`+++` headers.
pub fn generate_unified_for_file(old_text: &str, new_text: &str, old_path: &str, new_path: &str) -> String {
    let old_folded = fold_line_endings(old_text);
    let new_folded = fold_line_endings(new_text);
    let diff = TextDiff::from_lines(&old_folded, &new_folded);
    diff.unified_diff().context_radius(3).header(old_path, new_path).to_string()
}

/// Generates one classic unified diff block per file in `patchset`, in
/// patch order, comparing `baseline` (pre-apply content, keyed by display
/// path) against `outputs` (post-apply content). Binary files are skipped.
pub fn generate_unified_patchset(
    baseline: &BTreeMap<String, String>,
    outputs: &BTreeMap<String, String>,
    patchset: &PatchSet,
) -> String {
    let mut buf = String::new();

    for fp in &patchset.files {
        if fp.is_binary {
            continue;
        }

        let display = &fp.display_path;
        let block = match fp.operation {
            Operation::Delete => {
                let old_text = baseline.get(display).map(String::as_str).unwrap_or("");
                generate_unified_for_file(old_text, "", &fp.old_path, "/dev/null")
            }
            Operation::Create => {
                let new_text = outputs.get(display).map(String::as_str).unwrap_or("");
                generate_unified_for_file("", new_text, "/dev/null", &fp.new_path)
            }
            Operation::Modify | Operation::Rename => {
                let old_text = baseline.get(display).map(String::as_str).unwrap_or("");
                let new_text = outputs.get(display).map(String::as_str).unwrap_or(old_text);
                generate_unified_for_file(old_text, new_text, &fp.old_path, &fp.new_path)
            }
        };

        if !block.is_empty() {
            buf.push_str(&block);
            if !buf.ends_with('\n') {
                buf.push('\n');
            }
        }
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_modify_diff() {
        let diff = generate_unified_for_file("one\ntwo\nthree\n", "one\nTWO\nthree\n", "a.txt", "a.txt");
        assert!(diff.contains("--- a.txt"));
        assert!(diff.contains("+++ a.txt"));
        assert!(diff.contains("-two"));
        assert!(diff.contains("+TWO"));
    }

    #[test]
    fn generates_create_diff_against_dev_null() {
        let diff = generate_unified_for_file("", "hello\n", "/dev/null", "new.txt");
        assert!(diff.contains("--- /dev/null"));
        assert!(diff.contains("+++ new.txt"));
        assert!(diff.contains("+hello"));
    }

    #[test]
    fn skips_binary_files_in_patchset_generation() {
        use crate::model::{Dialect, FilePatch, GitMetadata};
        let fp = FilePatch {
            old_path: "x.bin".to_string(),
            new_path: "x.bin".to_string(),
            display_path: "x.bin".to_string(),
            operation: Operation::Modify,
            hunks: Vec::new(),
            is_binary: true,
            binary_reason: Some("binary".to_string()),
            metadata: GitMetadata::default(),
        };
        let patchset = PatchSet { dialect: Dialect::Classic, files: vec![fp] };
        let out = generate_unified_patchset(&BTreeMap::new(), &BTreeMap::new(), &patchset);
        assert!(out.is_empty());
    }
}
