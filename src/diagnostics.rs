//! Typed per-hunk/per-file diagnostics.
//!
//! Replaces the heterogeneous `diagnostics` dict in
//! `original_source/src/patchstudio/core/applier.py` with the tagged-variant shape called
//! for in `spec.md` §9's REDESIGN note.

use crate::model::PreflightStatus;

/// How a hunk's anchor sequence was (or was not) located in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorTrace {
    /// Matched at the expected offset without searching.
    Strict { matched_at: usize },
    /// Matched within the fuzzy window after a strict miss.
    Fuzzy { matched_at: usize, delta: isize, candidate_count: usize, ambiguous: bool },
    /// No anchor match at all, strict or fuzzy.
    NoMatch { reason: String, window_searched: Option<(usize, usize)> },
}

/// A located-but-mismatched re-verify failure: the hunk's anchors matched,
/// but content under the matched position did not agree with the hunk body
/// (should be rare, since anchors already matched).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReVerifyMismatch {
    pub at: usize,
    pub expected: String,
    pub actual: Option<String>,
}

/// A non-fatal, per-file/per-hunk diagnostic surfaced in an [`crate::model::ApplyResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Preflight rejected this file before any hunk was attempted.
    BlockedByPreflight { reason: PreflightStatus },
    /// The locator could not place a hunk (strict and, if enabled, fuzzy).
    LocatorFailed {
        hunk_index: usize,
        hunk_header: String,
        attempted_line_1b: usize,
        trace: LocatorTrace,
        expected_excerpt: Vec<String>,
        actual_excerpt: Vec<String>,
    },
    /// The hunk's anchors matched a position, but re-verifying context or
    /// deletion lines against the buffer at that position failed.
    ApplyReVerifyFailed {
        hunk_index: usize,
        hunk_header: String,
        attempted_line_1b: usize,
        mismatch: ReVerifyMismatch,
    },
    /// An I/O failure encountered while reading the target file.
    Io { message: String },
}
