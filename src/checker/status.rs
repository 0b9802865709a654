// src/checker/status.rs
// =============================================================================
// This module holds what we know about every URL in the note.
//
// Key ideas:
// - One record per distinct URL string (the URL text IS the key)
// - Two copies of the same URL in a note always share one status
// - "Unchecked" is not stored: a URL with no record is unchecked
// - Records are never removed when a URL disappears from the text; they only
//   get overwritten when the same URL is probed again
//
// Rust concepts:
// - HashMap + Vec: fast lookup by key while keeping a stable order
// - Enums with serde: serialized as "checking" / "reachable" / "unreachable"
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Explicit states a URL can be in once the engine has seen it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// A probe has been dispatched and has not resolved yet
    Checking,
    /// The server answered with a success or redirect
    Reachable,
    /// The probe failed (HTTP error, timeout, DNS, ...)
    Unreachable,
}

impl LinkState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LinkState::Checking)
    }
}

/// Advisory byte offsets of a URL's first occurrence when its record was written.
///
/// Not updated as the text changes; the renderer always re-derives positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Everything we know about one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    /// The exact matched substring
    pub url: String,
    pub state: LinkState,
    /// Response code reported by the prober, if the server answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Short reason, only ever set for unreachable links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub span: Span,
}

impl LinkStatus {
    /// A fresh record for a URL whose probe is about to start
    pub fn checking(url: impl Into<String>, span: Span) -> Self {
        Self {
            url: url.into(),
            state: LinkState::Checking,
            http_status: None,
            error: None,
            span,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.state == LinkState::Reachable
    }
}

/// URL → status, keyed by URL text.
///
/// Iteration follows the order in which URLs were first recorded.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    records: Vec<LinkStatus>,
    index: HashMap<String, usize>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&LinkStatus> {
        self.index.get(url).map(|&i| &self.records[i])
    }

    // Inserts the record, replacing whatever we had for the same URL
    // Last write wins: there is no merging of old and new records
    pub fn upsert(&mut self, record: LinkStatus) {
        match self.index.get(&record.url) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.url.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// True iff a probe for this URL is currently in flight
    pub fn contains_in_flight(&self, url: &str) -> bool {
        self.get(url)
            .is_some_and(|record| record.state == LinkState::Checking)
    }

    /// Throws away every record and loads the given ones instead.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = LinkStatus>) {
        self.records.clear();
        self.index.clear();
        for record in records {
            self.upsert(record);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, in order of first appearance
    pub fn records(&self) -> &[LinkStatus] {
        &self.records
    }
}
