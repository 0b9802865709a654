// src/checker/mod.rs
// =============================================================================
// This module contains everything about individual links.
//
// Submodules:
// - extract: Finds URLs in free-form note text
// - status: The table of what we know about each URL
// - http: Probes URLs to see if they are reachable
//
// This file (mod.rs) is the module root - it re-exports the public API so the
// rest of the crate can write `checker::extract_urls()` and friends.
// =============================================================================

mod extract;
mod http;
mod status;

pub use extract::{extract_spans, extract_urls, UrlSpan};
pub use http::{classify_status, HttpProber, ProbeFailure, ProbeOutcome, Prober, Verdict};
pub use status::{LinkState, LinkStatus, Span, StatusTable};
