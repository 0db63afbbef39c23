//! Pure, in-memory preview of an entire [`PatchSet`] against a workspace
//! root: runs preflight, then applies each non-blocked file's hunks in
//! memory via [`crate::applier::memory`].
//!
//! Grounded in `original_source/src/patchstudio/core/applier.py::preview_apply`.

use std::path::Path;

use tracing::{info, warn};

use crate::applier::memory::apply_filepatch_in_memory;
use crate::applier::path_resolve::resolve_within_root;
use crate::applier::preflight::preflight;
use crate::diagnostics::Diagnostic;
use crate::model::{
    ApplyResult, FileOutcome, FileStats, FileStatus, LogLevel, Operation, PatchSet,
    PreflightStatus, PreflightStatusSnapshot,
};
use crate::options::ApplyOptions;

fn is_blocking(status: &PreflightStatus, skip_unsupported_binary: bool) -> bool {
    status.is_blocking(skip_unsupported_binary)
}

/// Runs preflight and, if nothing blocks, applies every file's hunks in
/// memory. Succeeds even when individual files end up `Conflicted`, since
/// conflict markers are themselves valid preview output; only `Failed`
/// files (without `partial_apply_per_file_override`) fail the whole run.
pub fn preview(patchset: &PatchSet, root: &Path, options: &ApplyOptions) -> ApplyResult {
    let mut result = ApplyResult::new("Preview failed.");
    let report = preflight(patchset, Some(root), options);

    let blocking: Vec<_> =
        report.iter().filter(|r| is_blocking(&r.status, options.skip_unsupported_binary_files)).collect();

    result.preflight = report
        .iter()
        .map(|r| PreflightStatusSnapshot {
            display_path: r.display_path.clone(),
            operation: r.operation,
            status: r.status.clone(),
            suggested: r.suggested.clone(),
        })
        .collect();

    if !blocking.is_empty() {
        result.overall_message = "Patch references files not found under the selected root folder.".to_string();
        result.add_log(LogLevel::Warn, "Preflight failed; blocking preview.");
        result.success = false;
        return result;
    }

    result.add_log(LogLevel::Info, "Preflight passed for preview.");

    for record in &report {
        let fp = &record.file_patch;
        let display = fp.display_path.clone();

        if record.status == PreflightStatus::UnsupportedBinary {
            let status = if options.skip_unsupported_binary_files { FileStatus::Skipped } else { FileStatus::Blocked };
            if status == FileStatus::Blocked {
                result.failed_files.push(display.clone());
            }
            result.per_file.insert(
                display,
                FileOutcome {
                    status,
                    stats: FileStats::default(),
                    diagnostics: Vec::new(),
                    operation: fp.operation,
                    resolved: record.resolved.clone(),
                },
            );
            continue;
        }

        let content_source = match fp.operation {
            Operation::Create => None,
            Operation::Rename => resolve_within_root(root, &fp.old_path).filter(|p| p.exists()),
            _ => record.resolved.clone(),
        };

        let outcome = match apply_filepatch_in_memory(fp, content_source.as_deref(), options) {
            Ok(outcome) => outcome,
            Err(err) => {
                result.failed_files.push(display.clone());
                result.per_file.insert(
                    display.clone(),
                    FileOutcome {
                        status: FileStatus::Failed,
                        stats: FileStats::default(),
                        diagnostics: vec![Diagnostic::Io { message: err.to_string() }],
                        operation: fp.operation,
                        resolved: record.resolved.clone(),
                    },
                );
                result.add_log(LogLevel::Error, format!("Exception during preview apply: {err}"));
                if !options.partial_apply_per_file_override {
                    break;
                }
                continue;
            }
        };

        let conflict_allowed = options.conflict_marker_mode && outcome.conflicted;
        if outcome.failed && !conflict_allowed {
            result.failed_files.push(display.clone());
            result.per_file.insert(
                display.clone(),
                FileOutcome {
                    status: FileStatus::Failed,
                    stats: outcome.stats,
                    diagnostics: outcome.diagnostics,
                    operation: fp.operation,
                    resolved: record.resolved.clone(),
                },
            );
            result.add_log(LogLevel::Error, "Hunk application failed.");
            if !options.partial_apply_per_file_override {
                break;
            }
            continue;
        }

        if outcome.conflicted {
            result.conflicted_files.push(display.clone());
        }

        if fp.operation != Operation::Delete {
            result.outputs.insert(display.clone(), outcome.new_text);
        } else {
            result.outputs.insert(display.clone(), String::new());
        }

        let status = match fp.operation {
            _ if outcome.conflicted => FileStatus::Conflicted,
            Operation::Create => FileStatus::Created,
            Operation::Delete => FileStatus::Deleted,
            Operation::Rename => FileStatus::Renamed,
            Operation::Modify => FileStatus::Ok,
        };

        result.per_file.insert(
            display,
            FileOutcome {
                status,
                stats: outcome.stats,
                diagnostics: outcome.diagnostics,
                operation: fp.operation,
                resolved: record.resolved.clone(),
            },
        );
    }

    if !result.failed_files.is_empty() && !options.partial_apply_per_file_override {
        result.success = false;
        result.overall_message = "Preview failed due to one or more files.".to_string();
    } else {
        result.success = true;
        result.overall_message = "Preview succeeded.".to_string();
    }

    if !result.conflicted_files.is_empty() {
        warn!(conflicted = result.conflicted_files.len(), "preview produced conflicted output");
        result.add_log(LogLevel::Warn, "Preview produced conflicted output for some files.");
    }

    info!(files = report.len(), success = result.success, "preview complete");
    result
}
