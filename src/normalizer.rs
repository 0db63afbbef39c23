//! BOM/line-ending normalization, dialect detection, and per-file block
//! splitting.
//!
//! Grounded in `original_source/src/patchstudio/core/normalizer.py`
//! (`PatchInputNormalizer`). Dialect detection and block splitting are
//! deterministic functions of the normalized text, per `spec.md` §4.1.

use crate::model::Dialect;

const BIN_PATTERNS: [&str; 2] = ["GIT binary patch", "Binary files "];

/// A single file's raw text, still unparsed, carved out of the normalized
/// patch document by dialect-specific splitting rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    /// Raw block text, LF-terminated.
    pub text: String,
    pub dialect: Dialect,
    /// The path recovered from an `Index: ` line, for Index-dialect blocks.
    pub index_path: Option<String>,
    pub has_binary_indicator: bool,
}

/// Strips a leading UTF-8 BOM and folds CRLF/CR line endings to LF.
pub fn fold_line_endings(raw_text: &str) -> String {
    let stripped = raw_text.strip_prefix('\u{feff}').unwrap_or(raw_text);
    stripped.replace("\r\n", "\n").replace('\r', "\n")
}

/// Normalizes raw patch text and splits it into dialect-specific file
/// blocks. Returns the detected dialect and the ordered blocks.
pub fn normalize(raw_text: &str) -> (Dialect, Vec<FileBlock>) {
    let text = fold_line_endings(raw_text);
    let lines: Vec<&str> = text.split('\n').collect();

    let has_hunk = lines.iter().any(|l| l.starts_with("@@"));
    let has_git = lines.iter().any(|l| l.starts_with("diff --git "));
    let has_index = lines.iter().any(|l| l.starts_with("Index: "));
    let has_headers = lines.iter().any(|l| l.starts_with("--- "))
        && lines.iter().any(|l| l.starts_with("+++ "));

    let dialect = if has_git {
        Dialect::Git
    } else if has_index {
        Dialect::Index
    } else if has_headers || has_hunk {
        Dialect::Classic
    } else {
        Dialect::Classic
    };

    let mut blocks = if has_git {
        split_git_blocks(&lines)
    } else if has_index {
        split_index_blocks(&lines)
    } else {
        split_classic_blocks(&lines)
    };

    for block in &mut blocks {
        block.has_binary_indicator = has_binary_indicator(&block.text);
    }

    (dialect, blocks)
}

fn has_binary_indicator(text: &str) -> bool {
    BIN_PATTERNS.iter().any(|pat| text.contains(pat))
}

fn split_git_blocks(lines: &[&str]) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for &line in lines {
        if line.starts_with("diff --git ") {
            if !current.is_empty() {
                blocks.push(finish_block(&current, Dialect::Git, None));
            }
            current = vec![line];
        } else if !current.is_empty() {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(finish_block(&current, Dialect::Git, None));
    }
    blocks
}

fn split_index_blocks(lines: &[&str]) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_index_path: Option<String> = None;

    for &line in lines {
        if let Some(path) = line.strip_prefix("Index: ") {
            if !current.is_empty() {
                blocks.push(finish_block(&current, Dialect::Index, current_index_path.clone()));
            }
            current_index_path = Some(path.trim().to_string());
            current = vec![line];
        } else if !current.is_empty() {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(finish_block(&current, Dialect::Index, current_index_path));
    }
    blocks
}

/// Classic blocks split on `--- ` headers that are confirmed by a `+++ `
/// header within the next 60 lines, with no intervening `@@` hunk header.
fn split_classic_blocks(lines: &[&str]) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("--- ") {
            let lookahead_end = (i + 60).min(lines.len());
            let mut found_plus_plus = false;
            let mut j = i + 1;
            while j < lookahead_end {
                if lines[j].starts_with("+++ ") {
                    found_plus_plus = true;
                    break;
                }
                if lines[j].starts_with("@@ ") {
                    break;
                }
                j += 1;
            }

            if found_plus_plus {
                if !current.is_empty() {
                    blocks.push(finish_block(&current, Dialect::Classic, None));
                }
                current = vec![line];
            } else if !current.is_empty() {
                current.push(line);
            }
        } else if !current.is_empty() {
            current.push(line);
        }
        i += 1;
    }

    if !current.is_empty() {
        blocks.push(finish_block(&current, Dialect::Classic, None));
    }
    blocks
}

fn finish_block(lines: &[&str], dialect: Dialect, index_path: Option<String>) -> FileBlock {
    let mut text = lines.join("\n");
    text.push('\n');
    FileBlock { text, dialect, index_path, has_binary_indicator: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_git_dialect() {
        let text = "diff --git a/x.txt b/x.txt\nindex 1..2 100644\n--- a/x.txt\n+++ b/x.txt\n@@ -1 +1 @@\n-a\n+b\n";
        let (dialect, blocks) = normalize(text);
        assert_eq!(dialect, Dialect::Git);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn detects_index_dialect() {
        let text = "Index: hello.txt\n===\n--- hello.txt\n+++ hello.txt\n@@ -1 +1 @@\n-a\n+b\n";
        let (dialect, blocks) = normalize(text);
        assert_eq!(dialect, Dialect::Index);
        assert_eq!(blocks[0].index_path.as_deref(), Some("hello.txt"));
    }

    #[test]
    fn detects_classic_dialect() {
        let text = "--- a.txt\n+++ a.txt\n@@ -1 +1 @@\n-a\n+b\n";
        let (dialect, blocks) = normalize(text);
        assert_eq!(dialect, Dialect::Classic);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn classic_splits_multiple_files() {
        let text = "--- a.txt\n+++ a.txt\n@@ -1 +1 @@\n-a\n+b\n--- c.txt\n+++ c.txt\n@@ -1 +1 @@\n-c\n+d\n";
        let (_, blocks) = normalize(text);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn strips_bom_and_folds_crlf() {
        let text = "\u{feff}--- a.txt\r\n+++ a.txt\r\n@@ -1 +1 @@\r\n-a\r\n+b\r\n";
        let (_, blocks) = normalize(text);
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].text.contains('\r'));
        assert!(!blocks[0].text.contains('\u{feff}'));
    }

    #[test]
    fn detects_binary_indicator() {
        let text = "diff --git a/x.bin b/x.bin\nindex 1..2 100644\nGIT binary patch\nliteral 0\n";
        let (_, blocks) = normalize(text);
        assert!(blocks[0].has_binary_indicator);
    }

    #[test]
    fn normalization_is_idempotent() {
        let text = "\u{feff}--- a.txt\r\n+++ a.txt\r\n@@ -1 +1 @@\r\n-a\r\n+b\r\n";
        let once = fold_line_endings(text);
        let twice = fold_line_endings(&once);
        assert_eq!(once, twice);
    }
}
