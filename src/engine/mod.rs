// src/engine/mod.rs
// =============================================================================
// This module connects text edits to link probes.
//
// Submodules:
// - debounce: A single-slot timer that collapses bursts of edits
// - reconcile: The Engine itself (buffer, status table, dispatch protocol)
// =============================================================================

mod debounce;
mod reconcile;

pub use reconcile::{Dispatch, Engine};
