//! Editing of decorated strings by plain-text position.
//!
//! Single-character insertion and range erasure work directly on the raw
//! string; [`toggle_tag`] reparses it and rewrites the tag structure.

mod content;
mod styles;

pub use content::{cleanup, erase, insert_character, raw_offset};
pub use styles::toggle_tag;

/// Whether an edit changed the text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Unchanged,
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;

#[cfg(test)]
#[path = "editor/content_tests.rs"]
mod content_tests;
