//! Cache strategy port (driving/primary port)
//!
//! The interface the filesystem shim calls. Every operation maps onto one
//! filesystem entry point and reports a status code from
//! `mirrorfs_core::codes`; the shim passes codes through unchanged.

use mirrorfs_core::domain::entry::Entry;
use mirrorfs_core::domain::path::StorePath;

/// Port trait for the caching layer.
///
/// ## Implementation Notes
///
/// - `lookup_attributes` returns `None` only after the strategy has tried
///   to resolve the path against the remote store (or, for the full
///   strategy, its mirrored tree); the shim reports not-found.
/// - `shutdown` must be idempotent and safe to call while operations are
///   still in flight.
#[async_trait::async_trait]
pub trait ICacheStrategy: Send + Sync {
    /// Resolves the metadata entry for `path`, consulting the remote store
    /// when the tree only holds a placeholder.
    async fn lookup_attributes(&self, path: &StorePath) -> Option<Entry>;

    /// Materializes the local directory for an already-known remote
    /// directory entry.
    async fn make_dir_local(&self, path: &StorePath) -> i32;

    /// Lists the directory at `path`.
    async fn list_directory(&self, path: &StorePath) -> Vec<Entry>;

    /// Prepares `path` for reading: fetches the remote copy unless the
    /// local one is already cached (reported as `EEXIST`).
    async fn open_for_read(&self, path: &StorePath) -> i32;

    /// Records a newly created local file as `Ahead`.
    async fn create_entry(&self, path: &StorePath) -> i32;

    /// Creates a directory remotely and records it as `Synced`.
    async fn make_directory(&self, path: &StorePath) -> i32;

    /// Removes a file remotely and drops it from the tree.
    async fn remove_file(&self, path: &StorePath) -> i32;

    /// Removes a directory remotely; drops it from the tree on success.
    async fn remove_directory(&self, path: &StorePath) -> i32;

    /// Renames remotely and moves the entry to its new parent.
    async fn rename(&self, path: &StorePath, new_path: &StorePath) -> i32;

    /// Called when the shim closes a written file; decides whether the
    /// local copy must be published.
    async fn on_release(&self, path: &StorePath) -> i32;

    /// Called before a write; marks the entry `Ahead` when permitted.
    async fn on_write(&self, path: &StorePath) -> i32;

    /// POSIX-style access check: mask 0 tests existence, bits 1/2/4 test
    /// execute/write/read against the entry's permission string.
    async fn check_access(&self, path: &StorePath, mask: i32) -> i32;

    /// Sets the remote modification time (seconds since the epoch).
    async fn set_remote_mod_time(&self, path: &StorePath, mtime: i64) -> i32;

    /// Stops background work and releases remote sessions.
    async fn shutdown(&self);
}
