//! Rich text stored as a tag-decorated string.
//!
//! The decorated string (`This <strong>is</strong> good.`) is the only
//! persistent state. [`markup`] projects it onto plain text plus tags,
//! [`format`] flattens the tags into formatting ranges, and [`editor`]
//! changes it by plain-text position while keeping tags properly nested.

pub mod color;
pub mod css;
pub mod editor;
pub mod format;
pub mod markup;
pub mod render;
pub mod theme;
