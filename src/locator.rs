//! Locates a [`Hunk`]'s anchor sequence (context + deletion lines) inside an
//! in-memory line buffer, then applies it there.
//!
//! Grounded in `original_source/src/patchstudio/core/applier.py`'s `_locate_hunk_position`,
//! `_hunk_anchors_match`, and `_apply_hunk_at`. The Python `decision` dict is
//! replaced by [`LocatorTrace`] per `SPEC_FULL.md` §4.3.

use crate::diagnostics::{LocatorTrace, ReVerifyMismatch};
use crate::model::{Hunk, LineTag};

/// Trims trailing whitespace and, if `ignore_ws`, collapses interior
/// whitespace runs to a single space.
pub fn normalize_match_line(s: &str, ignore_ws: bool) -> String {
    let trimmed = s.trim_end();
    if !ignore_ws {
        return trimmed.to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    let mut prev_was_space = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                out.push(' ');
            }
            prev_was_space = true;
        } else {
            out.push(ch);
            prev_was_space = false;
        }
    }
    out
}

fn anchor_sequence(hunk: &Hunk) -> Vec<&str> {
    hunk.lines
        .iter()
        .filter(|l| matches!(l.tag, LineTag::Context | LineTag::Deletion))
        .map(|l| l.text.as_str())
        .collect()
}

/// First `limit` anchor (context/deletion) lines of `hunk`, for diagnostic
/// excerpts.
pub fn anchor_excerpt(hunk: &Hunk, limit: usize) -> Vec<String> {
    anchor_sequence(hunk).into_iter().take(limit).map(str::to_string).collect()
}

/// True if `hunk`'s context/deletion lines, in order, match `lines` starting
/// at `pos`. An empty anchor sequence (pure-addition hunk) matches anywhere.
pub fn hunk_anchors_match(lines: &[String], hunk: &Hunk, pos: usize, ignore_ws: bool) -> bool {
    let seq = anchor_sequence(hunk);
    if seq.is_empty() {
        return true;
    }
    if pos > lines.len() {
        return false;
    }

    let mut idx = pos;
    for want in seq {
        if idx >= lines.len() {
            return false;
        }
        let want_norm = normalize_match_line(want, ignore_ws);
        let have_norm = normalize_match_line(&lines[idx], ignore_ws);
        if want_norm != have_norm {
            return false;
        }
        idx += 1;
    }
    true
}

/// Attempts to locate `hunk` at `expected_pos`, falling back to a fuzzy
/// search within `±fuzzy_window` lines when `fuzzy` is enabled. Tie-breaks
/// deterministically on `(|candidate - expected_pos|, candidate)`.
pub fn locate_hunk_position(
    lines: &[String],
    hunk: &Hunk,
    expected_pos: usize,
    ignore_ws: bool,
    fuzzy: bool,
    fuzzy_window: usize,
) -> (Option<usize>, LocatorTrace) {
    let pos = expected_pos.min(lines.len());

    if hunk_anchors_match(lines, hunk, pos, ignore_ws) {
        return (Some(pos), LocatorTrace::Strict { matched_at: pos });
    }

    if !fuzzy {
        return (
            None,
            LocatorTrace::NoMatch {
                reason: "anchors did not match at the expected location".to_string(),
                window_searched: None,
            },
        );
    }

    let start = pos.saturating_sub(fuzzy_window);
    let end = (pos + fuzzy_window).min(lines.len());

    let mut candidates: Vec<usize> = (start..=end)
        .filter(|&p| hunk_anchors_match(lines, hunk, p, ignore_ws))
        .collect();

    if candidates.is_empty() {
        return (
            None,
            LocatorTrace::NoMatch {
                reason: "no anchor match found within the fuzzy window".to_string(),
                window_searched: Some((start, end)),
            },
        );
    }

    candidates.sort_by_key(|&p| (p.abs_diff(pos), p));
    let chosen = candidates[0];
    let ambiguous =
        candidates.len() > 1 && candidates[0].abs_diff(pos) == candidates[1].abs_diff(pos);

    (
        Some(chosen),
        LocatorTrace::Fuzzy {
            matched_at: chosen,
            delta: chosen as isize - pos as isize,
            candidate_count: candidates.len(),
            ambiguous,
        },
    )
}

/// Result of successfully applying a hunk at a located position.
pub struct HunkApplyOutcome {
    pub lines: Vec<String>,
    /// Net change in line count, for advancing the offset of later hunks.
    pub delta: isize,
}

/// Applies `hunk` at `pos`, re-verifying each context/deletion line against
/// the buffer as it goes. Returns the mismatch on the first line that does
/// not agree, even though anchors already matched (this should be rare).
pub fn apply_hunk_at(
    lines: &[String],
    hunk: &Hunk,
    pos: usize,
    ignore_ws: bool,
) -> Result<HunkApplyOutcome, ReVerifyMismatch> {
    let mut out = Vec::with_capacity(lines.len() + hunk.additions());
    out.extend_from_slice(&lines[..pos.min(lines.len())]);

    let mut i = pos;
    for line in &hunk.lines {
        match line.tag {
            LineTag::Context => {
                if i >= lines.len() {
                    return Err(ReVerifyMismatch { at: i, expected: line.text.clone(), actual: None });
                }
                let want = normalize_match_line(&line.text, ignore_ws);
                let have = normalize_match_line(&lines[i], ignore_ws);
                if want != have {
                    return Err(ReVerifyMismatch {
                        at: i,
                        expected: line.text.clone(),
                        actual: Some(lines[i].clone()),
                    });
                }
                out.push(lines[i].clone());
                i += 1;
            }
            LineTag::Deletion => {
                if i >= lines.len() {
                    return Err(ReVerifyMismatch { at: i, expected: line.text.clone(), actual: None });
                }
                let want = normalize_match_line(&line.text, ignore_ws);
                let have = normalize_match_line(&lines[i], ignore_ws);
                if want != have {
                    return Err(ReVerifyMismatch {
                        at: i,
                        expected: line.text.clone(),
                        actual: Some(lines[i].clone()),
                    });
                }
                i += 1;
            }
            LineTag::Addition => out.push(line.text.clone()),
        }
    }

    out.extend_from_slice(&lines[i.min(lines.len())..]);
    let delta = hunk.additions() as isize - hunk.deletions() as isize;
    Ok(HunkApplyOutcome { lines: out, delta })
}

/// Inserts `<<<<<<< ORIGINAL` / `=======` / `>>>>>>> PATCH` conflict markers
/// at `pos`, bracketing the hunk's pre-image and post-image.
pub fn insert_conflict_markers(lines: &mut Vec<String>, pos: usize, hunk: &Hunk) {
    let original_part: Vec<String> = hunk
        .lines
        .iter()
        .filter(|l| matches!(l.tag, LineTag::Context | LineTag::Deletion))
        .map(|l| l.text.clone())
        .collect();
    let patch_part: Vec<String> = hunk
        .lines
        .iter()
        .filter(|l| matches!(l.tag, LineTag::Context | LineTag::Addition))
        .map(|l| l.text.clone())
        .collect();

    let mut markers = Vec::with_capacity(original_part.len() + patch_part.len() + 3);
    markers.push("<<<<<<< ORIGINAL".to_string());
    markers.extend(original_part);
    markers.push("=======".to_string());
    markers.extend(patch_part);
    markers.push(">>>>>>> PATCH".to_string());

    let insert_at = pos.min(lines.len());
    lines.splice(insert_at..insert_at, markers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HunkLine;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn sample_hunk() -> Hunk {
        Hunk {
            old_start: 2,
            old_count: 2,
            new_start: 2,
            new_count: 2,
            header: "@@ -2,2 +2,2 @@".to_string(),
            lines: vec![HunkLine::context("b"), HunkLine::deletion("c"), HunkLine::addition("C")],
        }
    }

    #[test]
    fn strict_match_at_expected_position() {
        let buf = lines(&["a", "b", "c", "d"]);
        let hunk = sample_hunk();
        let (pos, trace) = locate_hunk_position(&buf, &hunk, 1, false, false, 0);
        assert_eq!(pos, Some(1));
        assert!(matches!(trace, LocatorTrace::Strict { matched_at: 1 }));
    }

    #[test]
    fn fuzzy_match_finds_drifted_position() {
        let buf = lines(&["x", "a", "b", "c", "d"]);
        let hunk = sample_hunk();
        let (pos, trace) = locate_hunk_position(&buf, &hunk, 1, false, true, 5);
        assert_eq!(pos, Some(2));
        assert!(matches!(trace, LocatorTrace::Fuzzy { matched_at: 2, .. }));
    }

    #[test]
    fn no_fuzzy_gives_no_match_when_strict_misses() {
        let buf = lines(&["x", "a", "b", "c", "d"]);
        let hunk = sample_hunk();
        let (pos, _) = locate_hunk_position(&buf, &hunk, 1, false, false, 5);
        assert_eq!(pos, None);
    }

    #[test]
    fn apply_hunk_replaces_deletion_with_addition() {
        let buf = lines(&["a", "b", "c", "d"]);
        let hunk = sample_hunk();
        let outcome = apply_hunk_at(&buf, &hunk, 1, false).unwrap();
        assert_eq!(outcome.lines, lines(&["a", "b", "C", "d"]));
        assert_eq!(outcome.delta, 0);
    }

    #[test]
    fn apply_hunk_reports_mismatch() {
        let buf = lines(&["a", "b", "X", "d"]);
        let hunk = sample_hunk();
        let err = apply_hunk_at(&buf, &hunk, 1, false).unwrap_err();
        assert_eq!(err.expected, "c");
        assert_eq!(err.actual.as_deref(), Some("X"));
    }

    #[test]
    fn ignore_whitespace_collapses_runs() {
        assert_eq!(normalize_match_line("a   b\t c", true), "a b c");
        assert_eq!(normalize_match_line("a   b", false), "a   b");
    }

    #[test]
    fn conflict_markers_bracket_both_sides() {
        let mut buf = lines(&["a", "b", "c", "d"]);
        let hunk = sample_hunk();
        insert_conflict_markers(&mut buf, 1, &hunk);
        assert_eq!(buf[1], "<<<<<<< ORIGINAL");
        assert!(buf.contains(&"=======".to_string()));
        assert!(buf.contains(&">>>>>>> PATCH".to_string()));
    }
}
