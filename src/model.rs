//! Shared data model: [`Hunk`], [`FilePatch`], [`PatchSet`], [`ApplyResult`].
//!
//! Grounded in `original_source/src/patchstudio/core/models.py`, translated from dynamically
//! tagged tuples/dicts into enums and structs, following the
//! `PatchLine`/`PatchChunk` split in the teacher's
//! `vtcode-core/src/tools/editing/patch/mod.rs`.

use std::collections::BTreeMap;
use std::time::SystemTime;

/// The dialect a [`PatchSet`] was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Classic,
    Git,
    Index,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Classic => "Classic Unified",
            Dialect::Git => "Git Unified",
            Dialect::Index => "Index style",
        }
    }
}

/// What a [`FilePatch`] does to its target path(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Modify,
    Create,
    Delete,
    Rename,
}

/// Tag of a single line inside a hunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineTag {
    Context,
    Addition,
    Deletion,
}

/// A single tagged line within a [`Hunk`], excluding the tag byte and the
/// trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub tag: LineTag,
    pub text: String,
}

impl HunkLine {
    pub fn context(text: impl Into<String>) -> Self {
        Self { tag: LineTag::Context, text: text.into() }
    }

    pub fn addition(text: impl Into<String>) -> Self {
        Self { tag: LineTag::Addition, text: text.into() }
    }

    pub fn deletion(text: impl Into<String>) -> Self {
        Self { tag: LineTag::Deletion, text: text.into() }
    }
}

/// A contiguous change region with an `@@ ... @@` header and tagged lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// The raw `@@ ... @@` header line, preserved verbatim for display.
    pub header: String,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// The subsequence of lines used to locate this hunk in a buffer:
    /// context and deletion lines, in order.
    pub fn anchor_lines(&self) -> impl Iterator<Item = &HunkLine> {
        self.lines.iter().filter(|l| matches!(l.tag, LineTag::Context | LineTag::Deletion))
    }

    pub fn additions(&self) -> usize {
        self.lines.iter().filter(|l| l.tag == LineTag::Addition).count()
    }

    pub fn deletions(&self) -> usize {
        self.lines.iter().filter(|l| l.tag == LineTag::Deletion).count()
    }
}

/// Git metadata collected from a `diff --git` block.
///
/// Each key the original parser collected as a string->string entry
/// (`parser.py`'s `metadata` dict) is a named, typed field here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitMetadata {
    pub diff_git_line: Option<String>,
    pub index: Option<String>,
    pub old_mode: Option<String>,
    pub new_mode: Option<String>,
    pub new_file_mode: Option<String>,
    pub deleted_file_mode: Option<String>,
    pub similarity_index: Option<String>,
    pub rename_from: Option<String>,
    pub rename_to: Option<String>,
    /// Set for Index-dialect blocks; the path following `Index: `.
    pub index_path: Option<String>,
}

/// A single file's changes within a [`PatchSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub old_path: String,
    pub new_path: String,
    /// The logical identity used throughout preview/apply/generate: the
    /// `b`-side path when present, else the `a`-side, with any `a/`/`b/`
    /// prefix stripped.
    pub display_path: String,
    pub operation: Operation,
    pub hunks: Vec<Hunk>,
    pub is_binary: bool,
    pub binary_reason: Option<String>,
    pub metadata: GitMetadata,
}

impl FilePatch {
    /// The relative path to resolve against a workspace root: `new_path`
    /// unless it is `/dev/null`, else `old_path`.
    pub fn target_path(&self) -> &str {
        if self.new_path != "/dev/null" { &self.new_path } else { &self.old_path }
    }
}

/// An ordered, immutable set of file patches parsed from one patch document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSet {
    pub dialect: Dialect,
    pub files: Vec<FilePatch>,
}

impl PatchSet {
    pub fn total_hunks(&self) -> usize {
        self.files.iter().map(|f| f.hunks.len()).sum()
    }

    pub fn total_files(&self) -> usize {
        self.files.len()
    }
}

/// Preflight status for a single [`FilePatch`] against a workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightStatus {
    Found,
    Invalid,
    OutsideRoot,
    UnsupportedBinary,
    Missing,
    Blocked,
}

impl PreflightStatus {
    pub fn is_blocking(&self, skip_unsupported_binary: bool) -> bool {
        match self {
            PreflightStatus::Found => false,
            PreflightStatus::UnsupportedBinary => !skip_unsupported_binary,
            _ => true,
        }
    }
}

/// One row of a preflight report: a file's resolved target and status.
#[derive(Debug, Clone)]
pub struct PreflightRecord {
    pub display_path: String,
    pub operation: Operation,
    pub resolved: Option<std::path::PathBuf>,
    pub status: PreflightStatus,
    pub suggested: String,
    pub file_patch: FilePatch,
}

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A single append-only log entry attached to an [`ApplyResult`].
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub ts: SystemTime,
    pub level: LogLevel,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// Per-file outcome recorded by preview/apply, keyed by display path in
/// [`ApplyResult::per_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    Conflicted,
    Skipped,
    Failed,
    Blocked,
    Created,
    Deleted,
    Modified,
    Renamed,
}

/// Per-file stats recorded for successfully previewed/applied hunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub hunks_applied: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
}

/// Per-file record stored in [`ApplyResult::per_file`].
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub status: FileStatus,
    pub stats: FileStats,
    pub diagnostics: Vec<crate::diagnostics::Diagnostic>,
    pub operation: Operation,
    pub resolved: Option<std::path::PathBuf>,
}

/// Result of a preview or disk-apply run.
#[derive(Debug, Clone, Default)]
pub struct ApplyResult {
    pub success: bool,
    pub overall_message: String,
    pub per_file: BTreeMap<String, FileOutcome>,
    pub preflight: Vec<PreflightStatusSnapshot>,
    pub outputs: BTreeMap<String, String>,
    pub conflicted_files: Vec<String>,
    pub failed_files: Vec<String>,
    pub files_applied: usize,
    pub backup_folder: Option<std::path::PathBuf>,
    pub logs: Vec<LogEntry>,
}

impl ApplyResult {
    pub fn new(overall_message: impl Into<String>) -> Self {
        Self { success: false, overall_message: overall_message.into(), ..Default::default() }
    }

    pub fn add_log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(LogEntry {
            ts: SystemTime::now(),
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        });
    }

    pub fn add_log_with(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) {
        self.logs.push(LogEntry { ts: SystemTime::now(), level, message: message.into(), fields });
    }
}

impl Default for FileStatus {
    fn default() -> Self {
        FileStatus::Ok
    }
}

/// A snapshot of a [`PreflightRecord`] retained on [`ApplyResult`] for host
/// display, without the borrowed [`FilePatch`].
#[derive(Debug, Clone)]
pub struct PreflightStatusSnapshot {
    pub display_path: String,
    pub operation: Operation,
    pub status: PreflightStatus,
    pub suggested: String,
}
