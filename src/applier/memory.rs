//! Applies one [`FilePatch`]'s hunks against an in-memory line buffer.
//!
//! Grounded in `original_source/src/patchstudio/core/applier.py::_apply_filepatch_in_memory`
//! and `_build_mismatch_diag`.

use std::path::Path;

use crate::applier::text::load_normalized;
use crate::diagnostics::Diagnostic;
use crate::error::PatchError;
use crate::locator::{anchor_excerpt, apply_hunk_at, insert_conflict_markers, locate_hunk_position};
use crate::model::{FilePatch, FileStats, Operation};
use crate::options::ApplyOptions;

/// Outcome of applying a [`FilePatch`] purely in memory.
pub struct MemoryApplyOutcome {
    pub new_text: String,
    pub stats: FileStats,
    pub diagnostics: Vec<Diagnostic>,
    pub failed: bool,
    pub conflicted: bool,
}

/// Applies `fp`'s hunks against the content at `resolved_path` (or an empty
/// buffer for `Create`), returning the resulting text and diagnostics.
/// Never writes to disk.
pub fn apply_filepatch_in_memory(
    fp: &FilePatch,
    resolved_path: Option<&Path>,
    options: &ApplyOptions,
) -> Result<MemoryApplyOutcome, PatchError> {
    let (mut out_lines, trailing_newline): (Vec<String>, bool) = if fp.operation == Operation::Create {
        (Vec::new(), true)
    } else {
        let path = resolved_path.expect("non-create operations resolve to a path");
        let (text, trailing_newline) = load_normalized(path)?;
        let body = if trailing_newline { text.strip_suffix('\n').unwrap_or(&text) } else { text.as_str() };
        let lines = if body.is_empty() && !trailing_newline {
            Vec::new()
        } else {
            body.split('\n').map(str::to_string).collect()
        };
        (lines, trailing_newline)
    };

    let mut stats = FileStats::default();
    let mut diagnostics = Vec::new();
    let mut failed = false;
    let mut conflicted = false;
    let mut line_offset: isize = 0;

    for (hunk_index, hunk) in fp.hunks.iter().enumerate() {
        let expected_pos = ((hunk.old_start as isize - 1) + line_offset).max(0) as usize;
        let (apply_pos, trace) = locate_hunk_position(
            &out_lines,
            hunk,
            expected_pos,
            options.ignore_whitespace_differences,
            options.best_effort_fuzzy_apply,
            options.fuzzy_window_size,
        );

        let Some(pos) = apply_pos else {
            diagnostics.push(Diagnostic::LocatorFailed {
                hunk_index,
                hunk_header: hunk.header.clone(),
                attempted_line_1b: expected_pos + 1,
                trace,
                expected_excerpt: anchor_excerpt(hunk, 5),
                actual_excerpt: excerpt_around(&out_lines, expected_pos),
            });

            if options.conflict_marker_mode {
                insert_conflict_markers(&mut out_lines, expected_pos, hunk);
                conflicted = true;
                stats.hunks_applied += 1;
                continue;
            }
            failed = true;
            break;
        };

        match apply_hunk_at(&out_lines, hunk, pos, options.ignore_whitespace_differences) {
            Ok(outcome) => {
                stats.hunks_applied += 1;
                stats.lines_added += hunk.additions();
                stats.lines_removed += hunk.deletions();
                line_offset += outcome.delta;
                out_lines = outcome.lines;
            }
            Err(mismatch) => {
                diagnostics.push(Diagnostic::ApplyReVerifyFailed {
                    hunk_index,
                    hunk_header: hunk.header.clone(),
                    attempted_line_1b: pos + 1,
                    mismatch,
                });

                if options.conflict_marker_mode {
                    insert_conflict_markers(&mut out_lines, pos, hunk);
                    conflicted = true;
                    stats.hunks_applied += 1;
                    continue;
                }
                failed = true;
                break;
            }
        }
    }

    let mut new_text = out_lines.join("\n");
    if trailing_newline {
        new_text.push('\n');
    }

    Ok(MemoryApplyOutcome { new_text, stats, diagnostics, failed, conflicted })
}

fn excerpt_around(lines: &[String], pos: usize) -> Vec<String> {
    let start = pos.saturating_sub(2);
    let end = (pos + 3).min(lines.len());
    if start >= end {
        return Vec::new();
    }
    lines[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GitMetadata, Hunk, HunkLine};
    use std::fs;

    fn patch_with_hunk(hunk: Hunk) -> FilePatch {
        FilePatch {
            old_path: "a.txt".to_string(),
            new_path: "a.txt".to_string(),
            display_path: "a.txt".to_string(),
            operation: Operation::Modify,
            hunks: vec![hunk],
            is_binary: false,
            binary_reason: None,
            metadata: GitMetadata::default(),
        }
    }

    #[test]
    fn applies_simple_modify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\ntwo\nthree\n").unwrap();

        let hunk = Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 1,
            header: "@@ -2 +2 @@".to_string(),
            lines: vec![HunkLine::deletion("two"), HunkLine::addition("TWO")],
        };
        let fp = patch_with_hunk(hunk);
        let outcome =
            apply_filepatch_in_memory(&fp, Some(path.as_path()), &ApplyOptions::default()).unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.new_text, "one\nTWO\nthree\n");
        assert_eq!(outcome.stats.hunks_applied, 1);
    }

    #[test]
    fn reports_failure_on_unmatched_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\ntwo\nthree\n").unwrap();

        let hunk = Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 1,
            header: "@@ -2 +2 @@".to_string(),
            lines: vec![HunkLine::deletion("nope"), HunkLine::addition("TWO")],
        };
        let fp = patch_with_hunk(hunk);
        let outcome =
            apply_filepatch_in_memory(&fp, Some(path.as_path()), &ApplyOptions::default()).unwrap();
        assert!(outcome.failed);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn conflict_mode_inserts_markers_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\ntwo\nthree\n").unwrap();

        let hunk = Hunk {
            old_start: 2,
            old_count: 1,
            new_start: 2,
            new_count: 1,
            header: "@@ -2 +2 @@".to_string(),
            lines: vec![HunkLine::deletion("nope"), HunkLine::addition("TWO")],
        };
        let fp = patch_with_hunk(hunk);
        let options = ApplyOptions { conflict_marker_mode: true, ..Default::default() };
        let outcome = apply_filepatch_in_memory(&fp, Some(path.as_path()), &options).unwrap();
        assert!(!outcome.failed);
        assert!(outcome.conflicted);
        assert!(outcome.new_text.contains("<<<<<<< ORIGINAL"));
    }

    #[test]
    fn create_operation_starts_from_empty_buffer() {
        let hunk = Hunk {
            old_start: 0,
            old_count: 0,
            new_start: 1,
            new_count: 1,
            header: "@@ -0,0 +1 @@".to_string(),
            lines: vec![HunkLine::addition("hello")],
        };
        let mut fp = patch_with_hunk(hunk);
        fp.operation = Operation::Create;
        fp.old_path = "/dev/null".to_string();
        let outcome = apply_filepatch_in_memory(&fp, None, &ApplyOptions::default()).unwrap();
        assert_eq!(outcome.new_text, "hello\n");
    }
}
