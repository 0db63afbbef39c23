//! # patchstudio-core
//!
//! Core engine for parsing, locating, previewing, and safely applying unified
//! diffs. This crate implements the non-UI half of a patch-review tool: it
//! ingests Classic/Git/Index-style unified diffs, locates hunks against a
//! workspace on disk with drift tolerance, and applies changes with backups
//! and atomic file replacement.
//!
//! ## Pipeline
//!
//! ```text
//! raw text -> Normalizer -> file blocks -> Parser -> PatchSet
//!          -> Applier::preflight -> PreflightRecord[]
//!          -> Applier::preview (uses Locator) -> ApplyResult
//!          -> Applier::apply_to_disk -> filesystem + ApplyResult
//! ```
//!
//! `DiffGenerator` runs the other direction: baseline + output text -> unified
//! diff text, for round-tripping previewed changes back into patch form.
//!
//! The engine is synchronous and single-threaded by design (see
//! [`applier`] for the apply pipeline); hosts that want it off their main
//! thread are responsible for running it on a worker thread themselves.

pub mod applier;
pub mod diagnostics;
pub mod diffgen;
pub mod error;
pub mod locator;
pub mod model;
pub mod normalizer;
pub mod options;
pub mod parser;

pub use applier::{apply_to_disk, preflight, preview};
pub use diagnostics::{Diagnostic, LocatorTrace};
pub use diffgen::generate_unified_patchset;
pub use error::PatchError;
pub use model::{
    ApplyResult, Dialect, FilePatch, GitMetadata, Hunk, LineTag, LogEntry, LogLevel, Operation,
    PatchSet, PreflightRecord, PreflightStatus,
};
pub use options::ApplyOptions;
pub use parser::parse;

/// Normalizes raw patch text and parses it into a [`PatchSet`].
///
/// This is the composition of [`normalizer::normalize`] and [`parser::parse`]
/// that most callers want; it is the library's main entry point.
pub fn parse_patch(raw_text: &str) -> PatchSet {
    let (dialect, blocks) = normalizer::normalize(raw_text);
    parser::parse(dialect, &blocks)
}
