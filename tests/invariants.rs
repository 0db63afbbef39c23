//! Property tests for the quantified invariants, in the style of
//! `vtcode-core/tests/loop_detector_props.rs`.

use proptest::prelude::*;

use patchstudio_core::normalizer::fold_line_endings;
use patchstudio_core::{preflight, ApplyOptions, Dialect, FilePatch, GitMetadata, Operation, PatchSet};

fn modify_patch(rel_path: &str) -> FilePatch {
    FilePatch {
        old_path: rel_path.to_string(),
        new_path: rel_path.to_string(),
        display_path: rel_path.to_string(),
        operation: Operation::Modify,
        hunks: Vec::new(),
        is_binary: false,
        binary_reason: None,
        metadata: GitMetadata::default(),
    }
}

proptest! {
    /// Invariant 1: normalize(normalize(x)) == normalize(x).
    #[test]
    fn prop_normalization_is_idempotent(raw in "[\\PC\\r\\n]{0,200}") {
        let once = fold_line_endings(&raw);
        let twice = fold_line_endings(&once);
        prop_assert_eq!(once, twice);
    }

    /// Folding never leaves a bare CR or CRLF behind.
    #[test]
    fn prop_normalization_removes_cr(raw in "[\\PC\\r\\n]{0,200}") {
        let folded = fold_line_endings(&raw);
        prop_assert!(!folded.contains('\r'));
    }

    /// Invariant 7: a relative path containing a leading parent-dir segment
    /// never resolves to Found/Missing (i.e. never resolves inside root);
    /// it is always rejected as OutsideRoot.
    #[test]
    fn prop_parent_traversal_never_resolves_inside_root(segment in "[a-zA-Z0-9_]{1,12}") {
        let dir = tempfile::tempdir().unwrap();
        let rel = format!("../{segment}");
        let patchset = PatchSet { dialect: Dialect::Classic, files: vec![modify_patch(&rel)] };
        let report = preflight(&patchset, Some(dir.path()), &ApplyOptions::default());
        prop_assert_eq!(report[0].status.clone(), patchstudio_core::PreflightStatus::OutsideRoot);
    }

    /// Invariant 7: a plain relative path (no traversal) under an existing
    /// root never reports OutsideRoot.
    #[test]
    fn prop_plain_relative_path_never_outside_root(segment in "[a-zA-Z0-9_]{1,12}") {
        let dir = tempfile::tempdir().unwrap();
        let rel = format!("{segment}.txt");
        let patchset = PatchSet { dialect: Dialect::Classic, files: vec![modify_patch(&rel)] };
        let report = preflight(&patchset, Some(dir.path()), &ApplyOptions::default());
        prop_assert_ne!(report[0].status.clone(), patchstudio_core::PreflightStatus::OutsideRoot);
    }
}
