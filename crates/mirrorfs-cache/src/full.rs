//! Background mirroring strategy
//!
//! The full strategy keeps the whole namespace mirrored ahead of demand:
//! - a **lister task** periodically walks the remote tree and queues every
//!   out-of-sync file with the [`TransferLedger`];
//! - a **drain loop** turns queued paths into batches and hands them to
//!   bounded worker pools, one per direction, without waiting for them;
//! - a **keepalive task** pings the pooled sessions so the remote end does
//!   not reap them between listing cycles.
//!
//! Filesystem requests are answered from the tree alone; the pipeline does
//! the remote round trips.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use mirrorfs_core::codes;
use mirrorfs_core::config::Config;
use mirrorfs_core::domain::entry::{Entry, SyncStatus};
use mirrorfs_core::domain::path::StorePath;
use mirrorfs_core::ports::{IRemoteStore, TransferDirection};
use mirrorfs_core::tree::NamespaceTree;

use crate::ledger::TransferLedger;
use crate::shared::StrategyCore;
use crate::strategy::ICacheStrategy;

/// How long a quiet drain loop sleeps before re-checking the queues.
const DRAIN_IDLE_PAUSE: Duration = Duration::from_millis(200);

/// Graceful shutdown bounds per task group; after the bound the group is
/// cut off hard.
const KEEPALIVE_STOP_BOUND: Duration = Duration::from_secs(2);
const LISTER_STOP_BOUND: Duration = Duration::from_secs(5);
const DRAIN_STOP_BOUND: Duration = Duration::from_secs(10);
const PULL_WORKERS_STOP_BOUND: Duration = Duration::from_secs(5);
const PUSH_WORKERS_STOP_BOUND: Duration = Duration::from_secs(30);

/// The background mirroring strategy.
pub struct FullCache {
    core: StrategyCore,
    ledger: Arc<TransferLedger>,
    token: CancellationToken,
    pull_hard: CancellationToken,
    push_hard: CancellationToken,
    pull_workers: TaskTracker,
    push_workers: TaskTracker,
    keepalive_task: Mutex<Option<JoinHandle<()>>>,
    lister_task: Mutex<Option<JoinHandle<()>>>,
    drain_task: Mutex<Option<JoinHandle<()>>>,
}

impl FullCache {
    /// Builds the strategy and starts its background tasks. Must be called
    /// from within a tokio runtime.
    pub fn new(tree: Arc<NamespaceTree>, store: Arc<dyn IRemoteStore>, config: &Config) -> Self {
        let ledger = Arc::new(TransferLedger::new());
        let token = CancellationToken::new();
        let pull_hard = CancellationToken::new();
        let push_hard = CancellationToken::new();
        let pull_workers = TaskTracker::new();
        let push_workers = TaskTracker::new();

        let keepalive_task = tokio::spawn(Self::keepalive_loop(
            Arc::clone(&store),
            token.clone(),
            Duration::from_secs(config.keepalive.period_secs),
        ));
        let lister_task = tokio::spawn(Self::lister_loop(
            Arc::clone(&tree),
            Arc::clone(&store),
            Arc::clone(&ledger),
            token.clone(),
            Duration::from_secs(config.listing.initial_delay_secs),
            Duration::from_secs(config.listing.period_secs),
        ));
        let drain_task = tokio::spawn(Self::drain_loop(DrainContext {
            tree: Arc::clone(&tree),
            store: Arc::clone(&store),
            ledger: Arc::clone(&ledger),
            token: token.clone(),
            pull_hard: pull_hard.clone(),
            push_hard: push_hard.clone(),
            pull_workers: pull_workers.clone(),
            push_workers: push_workers.clone(),
            batch_size: config.transfer.batch_size,
            workers_per_direction: config.pool.capacity,
        }));

        Self {
            core: StrategyCore {
                tree,
                store,
                local_root: config.local.root_dir.clone(),
                user: config.local.user.clone(),
                group: config.local.group.clone(),
            },
            ledger,
            token,
            pull_hard,
            push_hard,
            pull_workers,
            push_workers,
            keepalive_task: Mutex::new(Some(keepalive_task)),
            lister_task: Mutex::new(Some(lister_task)),
            drain_task: Mutex::new(Some(drain_task)),
        }
    }

    async fn keepalive_loop(
        store: Arc<dyn IRemoteStore>,
        token: CancellationToken,
        period: Duration,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(period) => {}
            }
            store.keep_alive().await;
            trace!("Keepalive round complete");
        }
    }

    async fn lister_loop(
        tree: Arc<NamespaceTree>,
        store: Arc<dyn IRemoteStore>,
        ledger: Arc<TransferLedger>,
        token: CancellationToken,
        initial_delay: Duration,
        period: Duration,
    ) {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = sleep(initial_delay) => {}
        }
        let root = StorePath::root();
        loop {
            let code = store.list_recursive(&root).await;
            if code == codes::OK {
                let behind = tree.collect_out_of_sync(&root, -1, SyncStatus::Behind);
                let ahead = tree.collect_out_of_sync(&root, -1, SyncStatus::Ahead);
                debug!(
                    behind = behind.len(),
                    ahead = ahead.len(),
                    "Listing cycle complete"
                );
                ledger.enqueue(TransferDirection::Pull, behind);
                ledger.enqueue(TransferDirection::Push, ahead);
            } else {
                warn!(code, "Recursive listing failed, will retry next cycle");
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(period) => {}
            }
        }
    }

    async fn drain_loop(ctx: DrainContext) {
        let pull_slots = Arc::new(Semaphore::new(ctx.workers_per_direction));
        let push_slots = Arc::new(Semaphore::new(ctx.workers_per_direction));

        loop {
            if ctx.token.is_cancelled() {
                break;
            }
            let mut submitted = false;
            for direction in [TransferDirection::Pull, TransferDirection::Push] {
                let slots = match direction {
                    TransferDirection::Pull => &pull_slots,
                    TransferDirection::Push => &push_slots,
                };
                // Take the worker slot before claiming paths: a direction
                // whose workers are all busy is skipped, so it neither
                // stalls the other direction nor parks claims in the
                // in-flight set.
                let Ok(permit) = Arc::clone(slots).try_acquire_owned() else {
                    continue;
                };
                let batch = ctx.ledger.drain_batch(direction, ctx.batch_size);
                if batch.is_empty() {
                    drop(permit);
                    continue;
                }
                submitted = true;

                let tree = Arc::clone(&ctx.tree);
                let store = Arc::clone(&ctx.store);
                let ledger = Arc::clone(&ctx.ledger);
                let (tracker, hard) = match direction {
                    TransferDirection::Pull => (&ctx.pull_workers, ctx.pull_hard.clone()),
                    TransferDirection::Push => (&ctx.push_workers, ctx.push_hard.clone()),
                };
                tracker.spawn(async move {
                    tokio::select! {
                        _ = hard.cancelled() => {
                            debug!("Batch cut off during shutdown");
                        }
                        _ = Self::execute_batch(&tree, &store, &batch, direction) => {}
                    }
                    ledger.release(&batch);
                    drop(permit);
                });
            }
            if !submitted {
                tokio::select! {
                    _ = ctx.token.cancelled() => break,
                    _ = sleep(DRAIN_IDLE_PAUSE) => {}
                }
            }
        }
    }

    /// Runs one claimed batch to completion and applies the collective
    /// outcome to the tree.
    async fn execute_batch(
        tree: &NamespaceTree,
        store: &Arc<dyn IRemoteStore>,
        batch: &[StorePath],
        direction: TransferDirection,
    ) {
        // Optimistic: mark the members synced before transferring so a
        // racing listing does not re-queue them mid-flight.
        for path in batch {
            tree.with_entry_mut(path, |e| e.status = SyncStatus::Synced);
        }
        let code = store.transfer_many(batch, direction).await;
        match code {
            codes::OK => {
                if direction == TransferDirection::Push {
                    // Align the remote timestamps so the next listing does
                    // not flag the files again.
                    for path in batch {
                        if let Some(entry) = tree.get_entry(path) {
                            let rc = store.set_mod_time(path, entry.mtime).await;
                            if rc != codes::OK {
                                warn!(path = %path, code = rc, "Failed to propagate mtime");
                            }
                        }
                    }
                }
                debug!(size = batch.len(), ?direction, "Batch transferred");
            }
            codes::ENOENT => {
                // The remote says these are gone; forget them locally.
                for path in batch {
                    tree.delete(path);
                }
            }
            _ => {
                warn!(code, ?direction, "Batch failed, re-flagging members");
                for path in batch {
                    tree.with_entry_mut(path, |e| e.status = direction.repairs());
                }
            }
        }
    }

    fn take_task(slot: &Mutex<Option<JoinHandle<()>>>) -> Option<JoinHandle<()>> {
        slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    async fn stop_task(handle: Option<JoinHandle<()>>, bound: Duration, name: &str) {
        let Some(mut handle) = handle else {
            return;
        };
        if timeout(bound, &mut handle).await.is_err() {
            warn!(task = name, "Task did not stop in time, aborting");
            handle.abort();
        }
    }

    async fn stop_workers(
        tracker: &TaskTracker,
        hard: &CancellationToken,
        bound: Duration,
        name: &str,
    ) {
        tracker.close();
        if timeout(bound, tracker.wait()).await.is_err() {
            warn!(group = name, "Workers did not finish in time, cutting off");
            hard.cancel();
            tracker.wait().await;
        }
    }
}

/// Everything the drain loop task owns.
struct DrainContext {
    tree: Arc<NamespaceTree>,
    store: Arc<dyn IRemoteStore>,
    ledger: Arc<TransferLedger>,
    token: CancellationToken,
    pull_hard: CancellationToken,
    push_hard: CancellationToken,
    pull_workers: TaskTracker,
    push_workers: TaskTracker,
    batch_size: usize,
    workers_per_direction: usize,
}

#[async_trait::async_trait]
impl ICacheStrategy for FullCache {
    async fn lookup_attributes(&self, path: &StorePath) -> Option<Entry> {
        if let Some(entry) = self.core.tree.get_entry(path) {
            return Some(entry);
        }
        // Not mirrored (yet); the next listing cycle may pick it up, but
        // the current answer is authoritative for the tree we have.
        let listing = self.list_directory(path).await;
        StrategyCore::find_in_listing(&listing, path)
    }

    async fn make_dir_local(&self, path: &StorePath) -> i32 {
        self.core.make_dir_local(path).await
    }

    async fn list_directory(&self, path: &StorePath) -> Vec<Entry> {
        let listing = self.core.tree.list_children(path);
        trace!(path = %path, "\n{}", self.core.tree.render(path));
        listing
    }

    async fn open_for_read(&self, path: &StorePath) -> i32 {
        self.core.open_for_read(path).await
    }

    async fn create_entry(&self, path: &StorePath) -> i32 {
        self.core.create_entry(path).await
    }

    async fn make_directory(&self, path: &StorePath) -> i32 {
        self.core.make_directory(path).await
    }

    async fn remove_file(&self, path: &StorePath) -> i32 {
        // Forget any pending transfer first so the pipeline cannot recreate
        // the file after the delete.
        self.ledger.purge(path);
        self.core.remove_file(path).await
    }

    async fn remove_directory(&self, path: &StorePath) -> i32 {
        self.core.remove_directory(path).await
    }

    async fn rename(&self, path: &StorePath, new_path: &StorePath) -> i32 {
        self.core.rename(path, new_path).await
    }

    async fn on_release(&self, path: &StorePath) -> i32 {
        // The pipeline owns publication; release just refreshes the size
        // the shim reports.
        if let Some((_, size)) = self.core.local_metadata(path) {
            self.core
                .tree
                .with_entry_mut(path, |e| e.size = size.to_string());
        }
        codes::OK
    }

    async fn on_write(&self, path: &StorePath) -> i32 {
        self.core.on_write(path).await
    }

    async fn check_access(&self, path: &StorePath, mask: i32) -> i32 {
        self.core.check_access(path, mask).await
    }

    async fn set_remote_mod_time(&self, path: &StorePath, mtime: i64) -> i32 {
        self.core.set_remote_mod_time(path, mtime).await
    }

    /// Graceful-then-forced stop: quiet tasks get short bounds, in-flight
    /// pushes get the longest one so local changes still reach the remote.
    async fn shutdown(&self) {
        info!("Stopping background mirror");
        self.token.cancel();

        Self::stop_task(
            Self::take_task(&self.keepalive_task),
            KEEPALIVE_STOP_BOUND,
            "keepalive",
        )
        .await;
        Self::stop_task(Self::take_task(&self.lister_task), LISTER_STOP_BOUND, "lister").await;
        Self::stop_task(Self::take_task(&self.drain_task), DRAIN_STOP_BOUND, "drain").await;

        Self::stop_workers(
            &self.pull_workers,
            &self.pull_hard,
            PULL_WORKERS_STOP_BOUND,
            "pull",
        )
        .await;
        Self::stop_workers(
            &self.push_workers,
            &self.push_hard,
            PUSH_WORKERS_STOP_BOUND,
            "push",
        )
        .await;
        info!("Background mirror stopped");
    }
}
