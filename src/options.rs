//! Explicit, typed configuration replacing the key-addressed option bag in
//! `original_source/src/patchstudio/core/applier.py` (`options.get("some_key", default)`
//! calls scattered through `preview_apply`/`apply_to_disk`), per the
//! REDESIGN note in `spec.md` §9.

use serde::{Deserialize, Serialize};

/// Options recognized by [`crate::applier::preflight`],
/// [`crate::applier::preview`], and [`crate::applier::apply_to_disk`].
///
/// A host may load this from `patchstudio.toml` or any other `serde` source;
/// the crate itself never reads configuration from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Reject paths that are absolute or contain `: * ? " < > |`.
    pub strict_filename_match: bool,
    /// Enable the locator's fuzzy step when a strict match misses.
    pub best_effort_fuzzy_apply: bool,
    /// Fuzzy search radius, in lines, on either side of the expected position.
    pub fuzzy_window_size: usize,
    /// Collapse runs of whitespace to a single space before comparing lines.
    pub ignore_whitespace_differences: bool,
    /// Insert `<<<<<<<`/`=======`/`>>>>>>>` conflict markers instead of
    /// failing a file when a hunk cannot be located or re-verified.
    pub conflict_marker_mode: bool,
    /// Permit rename operations during preflight/apply.
    pub allow_rename_delete_mode_changes: bool,
    /// Continue past per-file failures instead of aborting the whole run.
    pub partial_apply_per_file_override: bool,
    /// Detect and preserve a dominant-CRLF target file's line endings.
    pub preserve_original_line_endings: bool,
    /// Permit `apply_to_disk` to write output for files preview marked
    /// Conflicted.
    pub allow_writing_conflicted_output: bool,
    /// Skip binary `FilePatch`es during preflight instead of blocking.
    pub skip_unsupported_binary_files: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            strict_filename_match: false,
            best_effort_fuzzy_apply: false,
            fuzzy_window_size: 200,
            ignore_whitespace_differences: false,
            conflict_marker_mode: false,
            allow_rename_delete_mode_changes: false,
            partial_apply_per_file_override: false,
            preserve_original_line_endings: true,
            allow_writing_conflicted_output: false,
            skip_unsupported_binary_files: false,
        }
    }
}
