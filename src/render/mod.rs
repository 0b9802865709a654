// src/render/mod.rs
// =============================================================================
// This module draws the note with its links highlighted.
//
// Submodules:
// - highlight: Builds the display tree and serializes it (HTML / plain text)
// - caret: Snapshots and restores the caret across a full rebuild
// =============================================================================

mod caret;
mod highlight;

pub use caret::{preserve_selection, Position, Selection};
pub use highlight::{render, HighlightClass, LinkNode, Node, Rendered};
