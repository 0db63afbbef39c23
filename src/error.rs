use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an engine call outright.
///
/// Per the propagation policy, most failure modes (preflight blockers,
/// locator misses, re-verify mismatches, per-file I/O problems) are carried
/// as data inside [`crate::model::ApplyResult`] instead of being raised here.
/// `PatchError` is reserved for conditions on the primary backup/write/replace
/// path that `apply_to_disk` cannot recover from.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to create backup session folder '{path}': {source}")]
    BackupFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to back up '{path}' before mutating it: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to atomically replace '{path}': {source}")]
    AtomicReplace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("root folder '{0}' could not be resolved")]
    UnresolvableRoot(PathBuf),
}
