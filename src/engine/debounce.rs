// src/engine/debounce.rs
// =============================================================================
// A single-slot debounce timer.
//
// How it works:
// 1. schedule() spawns a task that sleeps for the delay, then runs the job
// 2. If schedule() is called again before the sleep ends, the old task is
//    aborted and replaced, so only one timer is ever live
// 3. The job runs at most once per quiet period
//
// A watch channel publishes the generation of the pending timer (or None),
// which lets callers wait until nothing is pending any more.
//
// Rust concepts:
// - JoinHandle::abort(): cancels a spawned task at its next .await
// - tokio::sync::watch: a "latest value" channel many tasks can observe
// =============================================================================

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct Debouncer {
    delay: Duration,
    slot: Mutex<Option<Slot>>,
    next_generation: AtomicU64,
    pending: Arc<watch::Sender<Option<u64>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        let (pending, _) = watch::channel(None);
        Self {
            delay,
            slot: Mutex::new(None),
            next_generation: AtomicU64::new(1),
            pending: Arc::new(pending),
        }
    }

    // Cancels any pending timer and starts a new one
    //
    // Parameters:
    //   job: the work to run once the delay has passed without another call
    pub fn schedule<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        self.pending.send_replace(Some(generation));

        let delay = self.delay;
        let pending = self.pending.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
            // A newer timer may already own the slot; only clear our own mark
            pending.send_if_modified(|current| {
                if *current == Some(generation) {
                    *current = None;
                    true
                } else {
                    false
                }
            });
        });

        *slot = Some(Slot { generation, handle });
    }

    /// Drops the pending timer, if any, without running its job.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
            self.pending.send_if_modified(|current| {
                if *current == Some(previous.generation) {
                    *current = None;
                    true
                } else {
                    false
                }
            });
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Resolves once no timer is pending (fired and finished, or cancelled).
    pub async fn idle(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in self, so the channel cannot close under us
        let _ = rx.wait_for(Option::is_none).await;
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
