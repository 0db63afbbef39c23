//! Validates a [`PatchSet`]'s file references against a workspace root.
//!
//! Grounded in `original_source/src/patchstudio/core/applier.py::preflight`.

use std::path::Path;

use crate::applier::path_resolve::resolve_within_root;
use crate::model::{Operation, PatchSet, PreflightRecord, PreflightStatus};
use crate::options::ApplyOptions;

const INVALID_PATH_CHARS: [char; 6] = [':', '*', '?', '"', '<', '>'];

fn looks_unsafe(rel: &str) -> bool {
    rel.starts_with('/')
        || rel.starts_with('\\')
        || rel.contains(|c| INVALID_PATH_CHARS.contains(&c) || c == '|')
}

/// Checks every file in `patchset` against `root`, returning one record per
/// file in patch order. With no root, every file is `Invalid`.
pub fn preflight(patchset: &PatchSet, root: Option<&Path>, options: &ApplyOptions) -> Vec<PreflightRecord> {
    let mut report = Vec::with_capacity(patchset.files.len());

    for fp in &patchset.files {
        let display = fp.display_path.clone();
        let operation = fp.operation;

        let Some(root) = root else {
            report.push(PreflightRecord {
                display_path: display,
                operation,
                resolved: None,
                status: PreflightStatus::Invalid,
                suggested: "Choose a root folder (Open Folder…) that contains the referenced files.".to_string(),
                file_patch: fp.clone(),
            });
            continue;
        };

        let candidate_rel = fp.target_path();
        if candidate_rel.is_empty() || candidate_rel == "/dev/null" {
            report.push(PreflightRecord {
                display_path: display,
                operation,
                resolved: None,
                status: PreflightStatus::Invalid,
                suggested: "Patch file header paths are missing or invalid.".to_string(),
                file_patch: fp.clone(),
            });
            continue;
        }

        if options.strict_filename_match && looks_unsafe(candidate_rel) {
            report.push(PreflightRecord {
                display_path: display,
                operation,
                resolved: None,
                status: PreflightStatus::Invalid,
                suggested: "Disable Strict filename match or fix patch paths to be relative and valid."
                    .to_string(),
                file_patch: fp.clone(),
            });
            continue;
        }

        let Some(resolved) = resolve_within_root(root, candidate_rel) else {
            report.push(PreflightRecord {
                display_path: display,
                operation,
                resolved: None,
                status: PreflightStatus::OutsideRoot,
                suggested: "Choose a different root folder or fix patch paths (path resolves outside root)."
                    .to_string(),
                file_patch: fp.clone(),
            });
            continue;
        };

        if fp.is_binary {
            report.push(PreflightRecord {
                display_path: display,
                operation,
                resolved: Some(resolved),
                status: PreflightStatus::UnsupportedBinary,
                suggested: "Enable 'Skip unsupported binary files' to apply other files; binary patch itself cannot be applied."
                    .to_string(),
                file_patch: fp.clone(),
            });
            continue;
        }

        let (status, suggested) = match operation {
            Operation::Modify => {
                if resolved.exists() {
                    (PreflightStatus::Found, String::new())
                } else {
                    (
                        PreflightStatus::Missing,
                        "Select a root folder that contains this file, or verify patch paths.".to_string(),
                    )
                }
            }
            Operation::Create => {
                let parent_ok = resolved.parent().map(|p| p.exists()).unwrap_or(false);
                if parent_ok {
                    (PreflightStatus::Found, String::new())
                } else {
                    (
                        PreflightStatus::Missing,
                        "Create the destination folders or choose a different root folder.".to_string(),
                    )
                }
            }
            Operation::Delete => {
                if resolved.exists() {
                    (PreflightStatus::Found, String::new())
                } else {
                    (
                        PreflightStatus::Missing,
                        "Select a root folder that contains the file to delete.".to_string(),
                    )
                }
            }
            Operation::Rename => {
                if !options.allow_rename_delete_mode_changes {
                    (
                        PreflightStatus::Blocked,
                        "Enable 'Allow rename/delete/mode changes' in Advanced to proceed.".to_string(),
                    )
                } else {
                    let old_rel = fp.old_path.as_str();
                    if old_rel.is_empty() || old_rel == "/dev/null" {
                        (PreflightStatus::Found, String::new())
                    } else {
                        match resolve_within_root(root, old_rel) {
                            None => (
                                PreflightStatus::OutsideRoot,
                                "Rename source resolves outside root; choose a different root folder."
                                    .to_string(),
                            ),
                            Some(old_abs) if !old_abs.exists() => (
                                PreflightStatus::Missing,
                                "Rename source file not found; choose a different root folder.".to_string(),
                            ),
                            Some(_) => (PreflightStatus::Found, String::new()),
                        }
                    }
                }
            }
        };

        report.push(PreflightRecord {
            display_path: display,
            operation,
            resolved: Some(resolved),
            status,
            suggested,
            file_patch: fp.clone(),
        });
    }

    report
}
