//! Pending-transfer bookkeeping
//!
//! The [`TransferLedger`] owns the pull queue, the push queue, and the
//! in-flight set behind a single mutex, so building a batch (size check,
//! dequeue, coalescing, in-flight claim) is one atomic step and no
//! lock-ordering question ever arises. Transfers themselves run outside
//! the lock.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use mirrorfs_core::domain::path::StorePath;
use mirrorfs_core::ports::TransferDirection;

#[derive(Default)]
struct LedgerInner {
    pull: VecDeque<StorePath>,
    push: VecDeque<StorePath>,
    in_flight: HashSet<StorePath>,
}

impl LedgerInner {
    fn queue_mut(&mut self, direction: TransferDirection) -> &mut VecDeque<StorePath> {
        match direction {
            TransferDirection::Pull => &mut self.pull,
            TransferDirection::Push => &mut self.push,
        }
    }
}

/// Queues of paths awaiting transfer, plus the set currently in flight.
///
/// The in-flight set spans both directions: a path being pulled must not
/// be pushed concurrently, and vice versa.
#[derive(Default)]
pub struct TransferLedger {
    inner: Mutex<LedgerInner>,
}

impl TransferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends paths to one direction's queue. Duplicates are allowed;
    /// batch building coalesces them.
    pub fn enqueue(&self, direction: TransferDirection, paths: Vec<StorePath>) {
        if paths.is_empty() {
            return;
        }
        let mut inner = self.lock();
        inner.queue_mut(direction).extend(paths);
    }

    /// Builds one batch of up to `batch_size` unique paths and claims them
    /// in flight, all in one critical section.
    ///
    /// Every dequeued path is coalesced: all of its other occurrences in
    /// the queue are dropped too. If a dequeued path is already in flight
    /// the whole batch is abandoned: the claims made so far are released
    /// and an empty batch is returned; the dropped paths will be
    /// re-collected by the next listing cycle.
    pub fn drain_batch(&self, direction: TransferDirection, batch_size: usize) -> Vec<StorePath> {
        let mut inner = self.lock();
        let mut batch: Vec<StorePath> = Vec::new();

        while batch.len() < batch_size {
            let Some(path) = inner.queue_mut(direction).pop_front() else {
                break;
            };
            inner.queue_mut(direction).retain(|p| p != &path);

            if inner.in_flight.contains(&path) {
                debug!(path = %path, "Path already in flight, abandoning batch");
                for claimed in &batch {
                    inner.in_flight.remove(claimed);
                }
                return Vec::new();
            }
            inner.in_flight.insert(path.clone());
            batch.push(path);
        }
        batch
    }

    /// Releases batch members from the in-flight set once their transfer
    /// has finished, whatever its outcome.
    pub fn release(&self, paths: &[StorePath]) {
        let mut inner = self.lock();
        for path in paths {
            inner.in_flight.remove(path);
        }
    }

    /// Drops every queued occurrence of `path` in both directions. Used
    /// when the file is deleted; an in-flight transfer is left to finish.
    pub fn purge(&self, path: &StorePath) {
        let mut inner = self.lock();
        inner.pull.retain(|p| p != path);
        inner.push.retain(|p| p != path);
    }

    /// Queued (not in-flight) paths in one direction.
    pub fn pending(&self, direction: TransferDirection) -> usize {
        let mut inner = self.lock();
        inner.queue_mut(direction).len()
    }
}
