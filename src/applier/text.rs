//! Line-ending detection, atomic writes, and best-effort sibling backups.
//!
//! Grounded in `original_source/src/patchstudio/core/applier.py`'s `_detect_eol`,
//! `_try_make_sibling_bak`, and `_atomic_write_text`, restructured after the
//! teacher's `LineEnding` split in `vtcode-core/src/tools/editing/patch/applicator/text.rs`.

use std::fs;
use std::path::Path;

use chrono::Local;

use crate::error::PatchError;

/// Line ending to use when writing a file back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Reads `path` and folds CRLF/CR to LF, returning the normalized text and
/// whether the original text ended with a trailing newline.
pub fn load_normalized(path: &Path) -> Result<(String, bool), PatchError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| PatchError::Io { action: "reading", path: path.to_path_buf(), source })?;
    let folded = raw.replace("\r\n", "\n").replace('\r', "\n");
    let trailing_newline = folded.ends_with('\n');
    Ok((folded, trailing_newline))
}

/// Detects the dominant line ending in a file's raw bytes. CRLF wins ties
/// and whenever it appears at all more than half as often as bare LF.
pub fn detect_eol(path: &Path) -> LineEnding {
    let Ok(data) = fs::read(path) else { return LineEnding::Lf };
    let crlf = count_subsequence(&data, b"\r\n");
    let lf = count_byte(&data, b'\n');
    if crlf > 0 && crlf >= lf.saturating_sub(crlf) {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}

fn count_byte(data: &[u8], byte: u8) -> usize {
    data.iter().filter(|&&b| b == byte).count()
}

fn count_subsequence(data: &[u8], needle: &[u8]) -> usize {
    data.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Writes `text` (internally LF-delimited) to `path` atomically: write to a
/// sibling temp file, then rename over the target.
pub fn atomic_write_text(path: &Path, text: &str, eol: LineEnding) -> Result<(), PatchError> {
    let data = if eol == LineEnding::CrLf { text.replace('\n', "\r\n") } else { text.to_string() };

    let tmp_name = format!(
        ".patchstudio_tmp_{}_{}",
        std::process::id(),
        Local::now().format("%Y%m%d%H%M%S%f")
    );
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, data)
        .map_err(|source| PatchError::Io { action: "writing", path: tmp_path.clone(), source })?;
    fs::rename(&tmp_path, path)
        .map_err(|source| PatchError::AtomicReplace { path: path.to_path_buf(), source })
}

/// Best-effort sibling `.bak` copy; failures here never abort the main
/// operation since the transactional backup folder already covers recovery.
pub fn try_make_sibling_bak(target: &Path) {
    if !target.is_file() {
        return;
    }
    let base_name = match target.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return,
    };

    let mut bak_path = target.with_file_name(format!("{base_name}.bak"));
    if bak_path.exists() {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        bak_path = target.with_file_name(format!("{base_name}.{stamp}.bak"));
    }
    let _ = fs::copy(target, bak_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_crlf_dominant_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "a\r\nb\r\nc\r\n").unwrap();
        assert_eq!(detect_eol(&path), LineEnding::CrLf);
    }

    #[test]
    fn detects_lf_dominant_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "a\nb\nc\n").unwrap();
        assert_eq!(detect_eol(&path), LineEnding::Lf);
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "old").unwrap();
        atomic_write_text(&path, "line1\nline2\n", LineEnding::Lf).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\nline2\n");
    }

    #[test]
    fn atomic_write_applies_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        atomic_write_text(&path, "line1\nline2\n", LineEnding::CrLf).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\r\nline2\r\n");
    }

    #[test]
    fn sibling_bak_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "content").unwrap();
        try_make_sibling_bak(&path);
        assert!(dir.path().join("a.txt.bak").exists());
    }

    #[test]
    fn load_normalized_reports_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "a\r\nb").unwrap();
        let (text, trailing) = load_normalized(&path).unwrap();
        assert_eq!(text, "a\nb");
        assert!(!trailing);
    }
}
