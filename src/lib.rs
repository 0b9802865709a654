// src/lib.rs
// =============================================================================
// link-notes: find the URLs in a note, check them, and highlight them.
//
// How the pieces fit:
//   user edits text
//     → engine restarts its debounce timer
//     → (2 s of quiet) engine extracts URLs from the latest text
//     → URLs without a status get probed
//     → results land in the status table
//     → render rebuilds the highlighted display
//
// persist saves / loads the raw text on its own, when asked.
// =============================================================================

pub mod checker; // src/checker/ - URL extraction, status table, HTTP prober
pub mod cli; // src/cli.rs - command-line parsing
pub mod config; // src/config.rs - settings and defaults
pub mod editor; // src/editor.rs - the editor host
pub mod engine; // src/engine/ - debounce and reconciliation
pub mod persist; // src/persist/ - saving and loading the note
pub mod render; // src/render/ - highlighted display and caret handling
