// src/engine/reconcile.rs
// =============================================================================
// The reconciliation engine: keeps the status table in step with the text.
//
// Two ways probes get started:
// - Typing: every edit restarts a 2 second debounce timer. When it fires, the
//   engine extracts URLs from the text as it is *then* and probes every URL
//   that has no record yet.
// - Check all: probes every URL in the text one after another, even the ones
//   that were already checked, with a short pause between requests.
//
// Per-URL protocol (check_link):
// 1. Already "checking"? Skip it, a probe is in flight
// 2. Write a "checking" record right away, before any .await
// 3. Ask the prober
// 4. Write the terminal record (reachable / unreachable)
// 5. If the prober itself failed, record "unreachable" with "Network error"
//
// Steps 1 and 2 happen under one lock, so two triggers racing for the same
// URL end up with exactly one probe.
//
// Rust concepts:
// - Arc + Mutex: shared state between the caller and spawned tasks
// - Weak: the debounce timer must not keep the engine alive on its own
// - tokio::sync::broadcast: tell listeners (the renderer) about every change
// =============================================================================

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use super::debounce::Debouncer;
use crate::checker::{extract_urls, LinkState, LinkStatus, Prober, Span, StatusTable, Verdict};
use crate::config::EngineConfig;
use crate::render::{render, Rendered};

// Shown when the prober itself errors out rather than reporting a broken link
const NETWORK_ERROR: &str = "Network error";

/// What happened to one dispatch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A probe for this URL was already in flight
    Skipped,
    /// The probe ran; this is the record it left behind
    Resolved(LinkStatus),
}

struct Inner {
    text: Mutex<String>,
    table: Mutex<StatusTable>,
    prober: Arc<dyn Prober>,
    debounce: Debouncer,
    config: EngineConfig,
    in_flight: watch::Sender<usize>,
    checking_all: AtomicBool,
    events: broadcast::Sender<LinkStatus>,
}

/// Handle to the engine. Clones share the same buffer and table.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Decrements the in-flight counter when a spawned probe ends, even on panic
struct InFlight<'a>(&'a watch::Sender<usize>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}

// Clears the "bulk check running" flag when check_all returns
struct BulkCheck<'a>(&'a AtomicBool);

impl Drop for BulkCheck<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Engine {
    pub fn new(prober: Arc<dyn Prober>, config: EngineConfig) -> Self {
        let (in_flight, _) = watch::channel(0);
        let (events, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(Inner {
                text: Mutex::new(String::new()),
                table: Mutex::new(StatusTable::new()),
                prober,
                debounce: Debouncer::new(config.debounce),
                config,
                in_flight,
                checking_all: AtomicBool::new(false),
                events,
            }),
        }
    }

    // Applies a user edit
    //
    // Replaces the buffer and restarts the debounce timer. The timer reads
    // the buffer again when it fires, so it always works on the latest text.
    pub fn set_text(&self, text: impl Into<String>) {
        *lock(&self.inner.text) = text.into();

        let weak = Arc::downgrade(&self.inner);
        self.inner.debounce.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                let dispatched = Engine { inner }.reconcile();
                debug!(dispatched, "debounced reconciliation pass");
            }
        });
    }

    /// Replaces the buffer without scheduling a reconciliation pass.
    ///
    /// Used for text that comes from storage rather than from typing.
    pub fn load_text(&self, text: impl Into<String>) {
        *lock(&self.inner.text) = text.into();
    }

    pub fn text(&self) -> String {
        lock(&self.inner.text).clone()
    }

    pub fn status(&self, url: &str) -> Option<LinkStatus> {
        lock(&self.inner.table).get(url).cloned()
    }

    /// A copy of the whole status table
    pub fn statuses(&self) -> StatusTable {
        lock(&self.inner.table).clone()
    }

    /// Receives every record the engine writes, in write order.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkStatus> {
        self.inner.events.subscribe()
    }

    // Runs one reconciliation pass over the current text
    //
    // Every URL that has no record at all gets a probe. URLs with a record
    // (checking or terminal) are left alone.
    //
    // Returns: how many probes were started
    pub fn reconcile(&self) -> usize {
        let text = self.text();
        let mut dispatched = 0;

        for url in extract_urls(&text) {
            if self.begin(&url, &text, true) {
                self.spawn_probe(url);
                dispatched += 1;
            }
        }

        dispatched
    }

    // Probes one URL, following the per-URL protocol described at the top
    pub async fn check_link(&self, url: &str) -> Dispatch {
        let text = self.text();
        if !self.begin(url, &text, false) {
            return Dispatch::Skipped;
        }
        Dispatch::Resolved(self.finish(url).await)
    }

    // Checks every URL in the note, one at a time
    //
    // Already-checked URLs are probed again. Each URL is probed once even if
    // it appears several times. Between probes we wait config.pacing so we
    // don't hammer the network.
    //
    // Returns: the records written by this bulk check
    pub async fn check_all(&self) -> Vec<LinkStatus> {
        if self.inner.checking_all.swap(true, Ordering::SeqCst) {
            debug!("bulk check already running");
            return Vec::new();
        }
        let _running = BulkCheck(&self.inner.checking_all);

        let mut seen = HashSet::new();
        let urls: Vec<String> = extract_urls(&self.text())
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();

        let mut results = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.inner.config.pacing).await;
            }
            match self.check_link(url).await {
                Dispatch::Resolved(record) => results.push(record),
                Dispatch::Skipped => debug!(url = %url, "skipped, probe already in flight"),
            }
        }

        results
    }

    /// Waits for the pending debounce pass and every probe it started.
    pub async fn settle(&self) {
        self.inner.debounce.idle().await;
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Cancels the pending debounce timer. Probes already in flight finish normally.
    pub fn shutdown(&self) {
        self.inner.debounce.cancel();
    }

    pub fn render(&self) -> Rendered {
        let text = self.text();
        let table = lock(&self.inner.table);
        render(&text, &table)
    }

    // Steps 1 and 2 of the protocol, under a single lock
    //
    // Parameters:
    //   only_if_new: true for reconciliation passes (any record means skip),
    //                false for explicit checks (only "checking" means skip)
    //
    // Returns: true if the caller should go on and probe
    fn begin(&self, url: &str, text: &str, only_if_new: bool) -> bool {
        let record = {
            let mut table = lock(&self.inner.table);
            match table.get(url) {
                Some(_) if only_if_new => return false,
                Some(existing) if existing.state == LinkState::Checking => return false,
                _ => {}
            }

            let record = LinkStatus::checking(url, first_span(text, url));
            table.upsert(record.clone());
            record
        };

        debug!(url, "probe dispatched");
        self.publish(record);
        true
    }

    fn spawn_probe(&self, url: String) {
        self.inner.in_flight.send_modify(|count| *count += 1);
        let engine = self.clone();
        tokio::spawn(async move {
            let _done = InFlight(&engine.inner.in_flight);
            engine.finish(&url).await;
        });
    }

    // Steps 3 to 5: probe, then write the terminal record
    async fn finish(&self, url: &str) -> LinkStatus {
        let outcome = self.inner.prober.probe(url).await;

        let record = {
            let mut table = lock(&self.inner.table);
            let span = table.get(url).map(|r| r.span).unwrap_or_default();

            let record = match outcome {
                Ok(outcome) => {
                    let error = match outcome.verdict {
                        Verdict::Reachable => None,
                        Verdict::Unreachable => Some(
                            outcome
                                .failure
                                .map(|f| f.to_string())
                                .unwrap_or_else(|| "Connection failed".to_string()),
                        ),
                    };
                    LinkStatus {
                        url: url.to_string(),
                        state: outcome.verdict.into(),
                        http_status: outcome.http_status,
                        error,
                        span,
                    }
                }
                Err(e) => {
                    warn!(url, error = %e, "prober failed");
                    LinkStatus {
                        url: url.to_string(),
                        state: LinkState::Unreachable,
                        http_status: None,
                        error: Some(NETWORK_ERROR.to_string()),
                        span,
                    }
                }
            };

            table.upsert(record.clone());
            record
        };

        debug!(url, state = ?record.state, error = ?record.error, "probe resolved");
        self.publish(record.clone());
        record
    }

    fn publish(&self, record: LinkStatus) {
        // Nobody listening is fine
        let _ = self.inner.events.send(record);
    }
}

fn first_span(text: &str, url: &str) -> Span {
    text.find(url)
        .map(|start| Span {
            start,
            end: start + url.len(),
        })
        .unwrap_or_default()
}
