//! Remote store port (driven/secondary port)
//!
//! This module defines the interface the caching strategies use to talk to
//! the remote hierarchical file store. The primary implementation drives a
//! pool of remote protocol connections, but the trait is transport-agnostic
//! so tests can substitute scripted fakes.
//!
//! ## Design Notes
//!
//! - Methods return plain `i32` status codes (see [`crate::codes`]) rather
//!   than `Result`: the codes travel unmodified to the filesystem shim, and
//!   a remote failure is an expected outcome the strategies branch on, not
//!   an error to propagate.
//! - Listing methods feed their records straight into the shared
//!   [`NamespaceTree`](crate::tree::NamespaceTree) as a side effect instead
//!   of returning them; callers read the tree afterwards. This keeps the
//!   mtime tie-break inside one tree lock per record.
//! - Uses `#[async_trait]` for async trait methods.

use crate::domain::entry::SyncStatus;
use crate::domain::path::StorePath;

/// Which way a file transfer moves data.
///
/// Each direction corresponds to the out-of-sync status it repairs: a
/// [`Pull`](TransferDirection::Pull) catches up a
/// [`Behind`](SyncStatus::Behind) entry, a
/// [`Push`](TransferDirection::Push) publishes an
/// [`Ahead`](SyncStatus::Ahead) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Remote to local.
    Pull,
    /// Local to remote.
    Push,
}

impl TransferDirection {
    /// The out-of-sync status this direction repairs.
    pub fn repairs(self) -> SyncStatus {
        match self {
            TransferDirection::Pull => SyncStatus::Behind,
            TransferDirection::Push => SyncStatus::Ahead,
        }
    }

    /// The direction needed to repair an out-of-sync status, or `None`
    /// when the entry is already synced.
    pub fn for_status(status: SyncStatus) -> Option<Self> {
        match status {
            SyncStatus::Behind => Some(TransferDirection::Pull),
            SyncStatus::Ahead => Some(TransferDirection::Push),
            SyncStatus::Synced => None,
        }
    }
}

/// Port trait for remote file store operations
///
/// This is the single interface the caching strategies use for remote I/O.
/// Implementations own connection management, protocol details, and the
/// mapping of transport failures onto the status codes in
/// [`crate::codes`].
///
/// ## Implementation Notes
///
/// - `transfer_many` exists so implementations can fan a batch out across
///   their available connections; the batch reports one collective code
///   and the caller decides what to do with the members.
/// - `keep_alive` is best-effort: it exists purely to stop idle sessions
///   from being reaped, and failures are logged, not reported.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Copies one file between the local cache and the remote store.
    ///
    /// # Arguments
    /// * `path` - Absolute path of the file in the mirrored namespace
    /// * `direction` - Pull (remote to local) or push (local to remote)
    ///
    /// # Returns
    /// [`codes::OK`](crate::codes::OK) on success, a negative code otherwise
    async fn transfer(&self, path: &StorePath, direction: TransferDirection) -> i32;

    /// Copies a batch of files in one direction, concurrently where the
    /// implementation allows.
    ///
    /// # Returns
    /// [`codes::OK`](crate::codes::OK) when every transfer succeeded,
    /// otherwise the code of the first failure in request order. The batch
    /// shares one fate: callers treat a failing batch as wholly failed
    /// and re-queue its members.
    async fn transfer_many(&self, paths: &[StorePath], direction: TransferDirection) -> i32;

    /// Creates a directory on the remote store.
    async fn make_dir(&self, path: &StorePath) -> i32;

    /// Removes a file from the remote store.
    async fn unlink(&self, path: &StorePath) -> i32;

    /// Removes an (empty) directory from the remote store.
    async fn rmdir(&self, path: &StorePath) -> i32;

    /// Renames a remote file or directory.
    async fn rename(&self, from: &StorePath, to: &StorePath) -> i32;

    /// Sets the remote modification time of `path` to `mtime` (seconds
    /// since the epoch). Used after a push so both sides agree on the
    /// timestamp and the next listing does not re-flag the file.
    async fn set_mod_time(&self, path: &StorePath, mtime: i64) -> i32;

    /// Lists one remote directory, upserting every record into the shared
    /// namespace tree with status [`SyncStatus::Behind`].
    async fn list(&self, path: &StorePath) -> i32;

    /// Recursively lists the remote subtree under `path`, upserting every
    /// record like [`list`](Self::list). Stops at the first failing level
    /// and returns its code.
    async fn list_recursive(&self, path: &StorePath) -> i32;

    /// Sends a keepalive on every pooled connection. Best-effort.
    async fn keep_alive(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_maps_to_status_and_back() {
        assert_eq!(TransferDirection::Pull.repairs(), SyncStatus::Behind);
        assert_eq!(TransferDirection::Push.repairs(), SyncStatus::Ahead);
        assert_eq!(
            TransferDirection::for_status(SyncStatus::Behind),
            Some(TransferDirection::Pull)
        );
        assert_eq!(
            TransferDirection::for_status(SyncStatus::Ahead),
            Some(TransferDirection::Push)
        );
        assert_eq!(TransferDirection::for_status(SyncStatus::Synced), None);
    }
}
