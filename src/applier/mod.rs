//! Preflight validation, in-memory preview, and transactional disk apply for
//! a [`crate::model::PatchSet`].
//!
//! Split the way the teacher splits its own applicator
//! (`vtcode-core/src/tools/editing/patch/applicator/{lifecycle,text,operations}.rs`): a
//! shared path-resolution helper, a text/EOL helper, a pure in-memory hunk
//! applier, and the two public entry points that sit on top of it.

mod disk;
mod memory;
mod path_resolve;
mod preflight;
mod preview;
mod text;

pub use disk::apply_to_disk;
pub use preflight::preflight;
pub use preview::preview;
