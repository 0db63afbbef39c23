//! Confirms, backs up, and writes a previewed [`PatchSet`] to disk.
//!
//! Grounded in `original_source/src/patchstudio/core/applier.py::apply_to_disk`, with the
//! backup-then-write-then-commit-or-rollback shape of the teacher's
//! `vtcode-core/src/tools/editing/patch/applicator/operations/update.rs` adapted from async
//! `tokio::fs` to synchronous `std::fs` per the concurrency model in
//! `spec.md` §5.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info, instrument};

use crate::applier::memory::apply_filepatch_in_memory;
use crate::applier::path_resolve::resolve_within_root;
use crate::applier::preflight::preflight;
use crate::applier::text::{atomic_write_text, detect_eol, try_make_sibling_bak, LineEnding};
use crate::error::PatchError;
use crate::model::{ApplyResult, FileOutcome, FileStats, FileStatus, LogLevel, Operation, PatchSet, PreflightStatus, PreflightStatusSnapshot};
use crate::options::ApplyOptions;

/// Copies `src` into `backup_root`, preserving its path relative to `root`.
/// A no-op if `src` does not exist or is not a regular file.
fn backup_file(src: &Path, root: &Path, backup_root: &Path) -> Result<(), PatchError> {
    if !src.is_file() {
        return Ok(());
    }
    let Ok(rel) = src.strip_prefix(root) else { return Ok(()) };
    let dest = backup_root.join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| PatchError::Backup { path: dest.clone(), source })?;
    }
    fs::copy(src, &dest).map_err(|source| PatchError::Backup { path: dest, source })?;
    Ok(())
}

/// Applies `patchset` to files under `root`, using `preview`'s computed
/// outputs where available. Requires the caller to have already obtained
/// user confirmation; this function performs no interactive gating itself.
#[instrument(skip(patchset, preview, options))]
pub fn apply_to_disk(
    patchset: &PatchSet,
    root: &Path,
    preview: &ApplyResult,
    options: &ApplyOptions,
) -> Result<ApplyResult, PatchError> {
    let mut result = ApplyResult::new("Apply failed.");
    let report = preflight(patchset, Some(root), options);

    result.preflight = report
        .iter()
        .map(|r| PreflightStatusSnapshot {
            display_path: r.display_path.clone(),
            operation: r.operation,
            status: r.status.clone(),
            suggested: r.suggested.clone(),
        })
        .collect();

    let blocking = report.iter().any(|r| r.status.is_blocking(options.skip_unsupported_binary_files));
    if blocking {
        result.overall_message = "Patch references files not found under the selected root folder.".to_string();
        result.add_log(LogLevel::Error, "Preflight failed; blocking apply.");
        result.success = false;
        return Ok(result);
    }

    if !preview.conflicted_files.is_empty() && !options.allow_writing_conflicted_output {
        result.overall_message = "Conflicted output was produced; writing to disk is blocked.".to_string();
        result.add_log(LogLevel::Error, "Conflicted output blocks disk write.");
        result.success = false;
        return Ok(result);
    }

    let canonical_root = root
        .canonicalize()
        .map_err(|_| PatchError::UnresolvableRoot(root.to_path_buf()))?;
    let backup_root = canonical_root.join(".patchstudio_backups").join(Local::now().format("%Y%m%d_%H%M%S").to_string());
    fs::create_dir_all(&backup_root)
        .map_err(|source| PatchError::BackupFolder { path: backup_root.clone(), source })?;
    result.add_log(LogLevel::Info, format!("Created backup folder at {}", backup_root.display()));
    result.backup_folder = Some(backup_root.clone());

    let mut files_applied = 0usize;

    for record in &report {
        let fp = &record.file_patch;
        let display = fp.display_path.clone();

        if record.status == PreflightStatus::UnsupportedBinary {
            if options.skip_unsupported_binary_files {
                result.per_file.insert(display, skipped_outcome(fp.operation));
                continue;
            }
            result.per_file.insert(display, blocked_outcome(fp.operation, None));
            if !options.partial_apply_per_file_override {
                result.overall_message = "Apply failed due to blocked binary patch.".to_string();
                result.success = false;
                return Ok(result);
            }
            continue;
        }

        let outcome = apply_one_file(fp, &canonical_root, &backup_root, preview, options);
        match outcome {
            Ok(status) => {
                if matches!(status, FileStatus::Created | FileStatus::Deleted | FileStatus::Modified | FileStatus::Renamed) {
                    files_applied += 1;
                }
                result.per_file.insert(
                    display,
                    FileOutcome { status, stats: FileStats::default(), diagnostics: Vec::new(), operation: fp.operation, resolved: record.resolved.clone() },
                );
            }
            Err(message) => {
                error!(file = %display, error = %message, "disk apply failed for file");
                result.add_log(LogLevel::Error, format!("Disk apply failed for {display}: {message}"));
                result.per_file.insert(display, failed_outcome(fp.operation, record.resolved.clone()));
                if !options.partial_apply_per_file_override {
                    result.overall_message = "Apply failed due to one or more files.".to_string();
                    result.success = false;
                    return Ok(result);
                }
            }
        }
    }

    result.success = true;
    result.overall_message = "Apply completed.".to_string();
    result.files_applied = files_applied;
    info!(files_applied, "apply complete");
    Ok(result)
}

fn skipped_outcome(operation: Operation) -> FileOutcome {
    FileOutcome { status: FileStatus::Skipped, stats: FileStats::default(), diagnostics: Vec::new(), operation, resolved: None }
}

fn blocked_outcome(operation: Operation, resolved: Option<PathBuf>) -> FileOutcome {
    FileOutcome { status: FileStatus::Blocked, stats: FileStats::default(), diagnostics: Vec::new(), operation, resolved }
}

fn failed_outcome(operation: Operation, resolved: Option<PathBuf>) -> FileOutcome {
    FileOutcome { status: FileStatus::Failed, stats: FileStats::default(), diagnostics: Vec::new(), operation, resolved }
}

fn apply_one_file(
    fp: &crate::model::FilePatch,
    root: &Path,
    backup_root: &Path,
    preview: &ApplyResult,
    options: &ApplyOptions,
) -> Result<FileStatus, String> {
    let display = &fp.display_path;
    let target_rel = fp.target_path();
    if target_rel.is_empty() {
        return Err("invalid target path".to_string());
    }
    let target_abs = resolve_within_root(root, target_rel).ok_or_else(|| "resolved path outside root".to_string())?;

    match fp.operation {
        Operation::Delete => {
            backup_file(&target_abs, root, backup_root).map_err(|e| e.to_string())?;
            try_make_sibling_bak(&target_abs);
            if target_abs.exists() {
                fs::remove_file(&target_abs).map_err(|e| e.to_string())?;
            }
            Ok(FileStatus::Deleted)
        }
        Operation::Create => {
            if let Some(parent) = target_abs.parent() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            let content = preview.outputs.get(display).cloned().unwrap_or_default();
            let eol = if options.preserve_original_line_endings && target_abs.exists() {
                detect_eol(&target_abs)
            } else {
                LineEnding::Lf
            };
            atomic_write_text(&target_abs, &content, eol).map_err(|e| e.to_string())?;
            Ok(FileStatus::Created)
        }
        Operation::Rename => {
            if !options.allow_rename_delete_mode_changes {
                return Err("rename not allowed (Advanced)".to_string());
            }
            if fp.old_path.is_empty() || fp.old_path == "/dev/null" {
                return Err("invalid rename source".to_string());
            }
            let old_abs =
                resolve_within_root(root, &fp.old_path).ok_or_else(|| "rename source outside root".to_string())?;
            backup_file(&old_abs, root, backup_root).map_err(|e| e.to_string())?;
            backup_file(&target_abs, root, backup_root).map_err(|e| e.to_string())?;
            try_make_sibling_bak(&old_abs);
            try_make_sibling_bak(&target_abs);
            if let Some(parent) = target_abs.parent() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            fs::rename(&old_abs, &target_abs).map_err(|e| e.to_string())?;

            if !fp.hunks.is_empty() {
                let eol = if options.preserve_original_line_endings { detect_eol(&target_abs) } else { LineEnding::Lf };
                let content = match preview.outputs.get(display) {
                    Some(content) => content.clone(),
                    None => apply_filepatch_in_memory(fp, Some(target_abs.as_path()), options)
                        .map_err(|e| e.to_string())?
                        .new_text,
                };
                atomic_write_text(&target_abs, &content, eol).map_err(|e| e.to_string())?;
            }
            Ok(FileStatus::Renamed)
        }
        Operation::Modify => {
            backup_file(&target_abs, root, backup_root).map_err(|e| e.to_string())?;
            try_make_sibling_bak(&target_abs);
            let eol = if options.preserve_original_line_endings && target_abs.exists() {
                detect_eol(&target_abs)
            } else {
                LineEnding::Lf
            };
            let content = match preview.outputs.get(display) {
                Some(content) => content.clone(),
                None => apply_filepatch_in_memory(fp, Some(target_abs.as_path()), options)
                    .map_err(|e| e.to_string())?
                    .new_text,
            };
            atomic_write_text(&target_abs, &content, eol).map_err(|e| e.to_string())?;
            Ok(FileStatus::Modified)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::preview::preview as run_preview;
    use crate::{normalizer, parser};

    #[test]
    fn applies_modify_and_creates_backup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one\ntwo\nthree\n").unwrap();

        let patch_text = "--- a.txt\n+++ a.txt\n@@ -2 +2 @@\n-two\n+TWO\n";
        let (dialect, blocks) = normalizer::normalize(patch_text);
        let patchset = parser::parse(dialect, &blocks);

        let options = ApplyOptions::default();
        let preview_result = run_preview(&patchset, dir.path(), &options);
        assert!(preview_result.success);

        let result = apply_to_disk(&patchset, dir.path(), &preview_result, &options).unwrap();
        assert!(result.success);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "one\nTWO\nthree\n");
        assert_eq!(result.files_applied, 1);
        assert!(result.backup_folder.is_some());
        let backup_root = result.backup_folder.unwrap();
        assert!(backup_root.join("a.txt").exists());
    }

    #[test]
    fn deletes_file_and_backs_it_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "content\n").unwrap();

        let patch_text = "--- a.txt\n+++ /dev/null\n@@ -1 +0,0 @@\n-content\n";
        let (dialect, blocks) = normalizer::normalize(patch_text);
        let patchset = parser::parse(dialect, &blocks);

        let options = ApplyOptions::default();
        let preview_result = run_preview(&patchset, dir.path(), &options);
        let result = apply_to_disk(&patchset, dir.path(), &preview_result, &options).unwrap();
        assert!(result.success);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn creates_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let patch_text = "--- /dev/null\n+++ new.txt\n@@ -0,0 +1 @@\n+hello\n";
        let (dialect, blocks) = normalizer::normalize(patch_text);
        let patchset = parser::parse(dialect, &blocks);

        let options = ApplyOptions::default();
        let preview_result = run_preview(&patchset, dir.path(), &options);
        assert!(preview_result.success);
        let result = apply_to_disk(&patchset, dir.path(), &preview_result, &options).unwrap();
        assert!(result.success);
        assert_eq!(fs::read_to_string(dir.path().join("new.txt")).unwrap(), "hello\n");
    }
}
